use std::fmt::{Debug, Formatter};

use awssign_core::hash::{hex_hmac_sha256, hmac_sha256};
use awssign_core::time::{format_date, format_iso8601, DateTime};

use crate::constants::{ALGORITHM, AWS4_REQUEST};

/// SigningKey is the HMAC key derived from the secret for one day, region and service.
///
/// - [Derive a signing key](https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html#derive-signing-key)
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Derive the signing key.
    ///
    /// Only the date part of `time` is used.
    pub fn derive(secret: &str, time: DateTime, region: &str, service: &str) -> Self {
        // Sign secret
        let secret = format!("AWS4{secret}");
        // Sign date
        let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
        // Sign region
        let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
        // Sign service
        let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
        // Sign request
        Self(hmac_sha256(sign_service.as_slice(), AWS4_REQUEST.as_bytes()))
    }

    /// Sign the given string and return the lowercase hex signature.
    pub fn sign(&self, string_to_sign: &str) -> String {
        hex_hmac_sha256(&self.0, string_to_sign.as_bytes())
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for SigningKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(***)")
    }
}

/// Scope: `20220313/<region>/<service>/aws4_request`
pub(crate) fn scope(time: DateTime, region: &str, service: &str) -> String {
    format!("{}/{region}/{service}/{AWS4_REQUEST}", format_date(time))
}

/// StringToSign:
///
/// ```text
/// AWS4-HMAC-SHA256
/// 20220313T072004Z
/// 20220313/<region>/<service>/aws4_request
/// <hashed_canonical_request>
/// ```
pub(crate) fn string_to_sign(time: DateTime, scope: &str, canonical_hash: &str) -> String {
    format!(
        "{ALGORITHM}\n{}\n{scope}\n{canonical_hash}",
        format_iso8601(time)
    )
}
