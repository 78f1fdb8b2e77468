use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use awssign_core::hash::hex_sha256;
use percent_encoding::utf8_percent_encode;

use crate::constants::{AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, UNSIGNED_PAYLOAD};

/// Payload describes how the request body takes part in the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Raw body bytes, hashed with SHA-256.
    Bytes(&'a [u8]),
    /// Body already hashed by the caller, as lowercase hex.
    Hashed(String),
    /// Body is not signed: `UNSIGNED-PAYLOAD`.
    Unsigned,
}

impl Payload<'_> {
    /// Value used as the payload hash in the canonical request.
    pub fn hash(&self) -> String {
        match self {
            Payload::Bytes(bs) => hex_sha256(bs),
            Payload::Hashed(h) => h.clone(),
            Payload::Unsigned => UNSIGNED_PAYLOAD.to_string(),
        }
    }
}

/// CanonicalRequest is the normalized form of an HTTP request that SigV4 hashes.
///
/// Building it is pure: the same logical request always yields byte-identical
/// output, no matter how headers were ordered or cased.
///
/// - [Create a canonical request](https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html#create-canonical-request)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    signed_headers: String,
    payload_hash: String,
}

impl CanonicalRequest {
    /// Build a canonical request.
    ///
    /// `path` and `query` are taken decoded and encoded here. Header values are
    /// trimmed and inner whitespace runs collapse to one space; repeated header
    /// names are merged with `,` in the order they were given.
    pub fn new<Q, QK, QV, H, HK, HV>(
        method: &str,
        path: &str,
        query: Q,
        headers: H,
        payload: Payload<'_>,
    ) -> Self
    where
        Q: IntoIterator<Item = (QK, QV)>,
        QK: AsRef<str>,
        QV: AsRef<str>,
        H: IntoIterator<Item = (HK, HV)>,
        HK: AsRef<str>,
        HV: AsRef<str>,
    {
        let path = if path.is_empty() { "/" } else { path };
        let path = utf8_percent_encode(path, &AWS_URI_ENCODE_SET).to_string();

        let mut query = query
            .into_iter()
            .map(|(k, v)| {
                (
                    utf8_percent_encode(k.as_ref(), &AWS_QUERY_ENCODE_SET).to_string(),
                    utf8_percent_encode(v.as_ref(), &AWS_QUERY_ENCODE_SET).to_string(),
                )
            })
            .collect::<Vec<_>>();
        query.sort();

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (k, v) in headers {
            grouped
                .entry(k.as_ref().trim().to_lowercase())
                .or_default()
                .push(normalize_header_value(v.as_ref()));
        }
        let headers = grouped
            .into_iter()
            .map(|(k, vs)| (k, vs.join(",")))
            .collect::<Vec<_>>();
        let signed_headers = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        Self {
            method: method.to_uppercase(),
            path,
            query,
            headers,
            signed_headers,
            payload_hash: payload.hash(),
        }
    }

    /// Upper-cased method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Encoded path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Encoded and sorted query pairs.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Lower-cased header names joined by `;`.
    pub fn signed_headers(&self) -> &str {
        &self.signed_headers
    }

    /// Payload hash: lowercase hex SHA-256 or `UNSIGNED-PAYLOAD`.
    pub fn payload_hash(&self) -> &str {
        &self.payload_hash
    }

    /// Hex SHA-256 of the canonical string.
    pub fn hash(&self) -> String {
        hex_sha256(self.to_string().as_bytes())
    }
}

impl Display for CanonicalRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{k}={v}")?;
        }
        writeln!(f)?;
        for (k, v) in &self.headers {
            writeln!(f, "{k}:{v}")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers)?;
        write!(f, "{}", self.payload_hash)
    }
}

fn normalize_header_value(v: &str) -> String {
    v.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}
