use std::time::Duration;

use awssign_core::time::DateTime;
use awssign_core::{Context, Error, Result, SigningMethod};
use percent_encoding::utf8_percent_encode;

use crate::canonical::Payload;
use crate::constants::AWS_QUERY_ENCODE_SET;
use crate::{Credential, Endpoint, RequestSigner};

/// PresignedGet builds time limited download URLs for objects.
#[derive(Debug, Clone)]
pub struct PresignedGet {
    endpoint: Endpoint,
    signer: RequestSigner,
}

impl PresignedGet {
    /// Create a generator for objects under `endpoint`, signed for S3 in `region`.
    pub fn new(endpoint: Endpoint, region: &str) -> Self {
        Self {
            endpoint,
            signer: RequestSigner::new("s3", region),
        }
    }

    /// Presign at the time given by the context clock.
    pub fn presign(
        &self,
        ctx: &Context,
        cred: &Credential,
        key: &str,
        version_id: Option<&str>,
        max_age: Duration,
    ) -> Result<String> {
        self.url(cred, key, version_id, max_age, ctx.now())
    }

    /// Build the presigned URL for `key` at the given time.
    ///
    /// `version_id` selects a specific object version.
    pub fn url(
        &self,
        cred: &Credential,
        key: &str,
        version_id: Option<&str>,
        max_age: Duration,
        now: DateTime,
    ) -> Result<String> {
        if key.trim_start_matches('/').is_empty() {
            return Err(Error::request_invalid("object key is empty"));
        }

        let mut url = self.endpoint.object_url(key);
        if let Some(version_id) = version_id {
            url.push_str("?versionId=");
            url.extend(utf8_percent_encode(version_id, &AWS_QUERY_ENCODE_SET));
        }

        let (mut parts, _) = http::Request::get(url).body(())?.into_parts();
        self.signer.sign(
            &mut parts,
            cred,
            SigningMethod::Query(max_age),
            Payload::Unsigned,
            now,
        )?;

        Ok(parts.uri.to_string())
    }
}
