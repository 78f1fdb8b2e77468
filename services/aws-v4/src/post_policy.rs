use std::time::Duration;

use awssign_core::hash::base64_encode;
use awssign_core::time::{format_iso8601, format_rfc3339, DateTime};
use awssign_core::{Context, Error, Result};
use log::debug;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::constants::ALGORITHM;
use crate::signing_key::{scope, SigningKey};
use crate::{Credential, Endpoint};

/// Upload describes the single object a browser is allowed to POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    key_prefix: String,
    filename: String,
    content_type: String,
    min_size: u64,
    max_size: u64,
    content_disposition: Option<String>,
    max_age: Duration,
}

impl Upload {
    /// Allow uploading `filename` under `key_prefix` with an exact size.
    ///
    /// The object key is `key_prefix + filename`. `Content-Disposition` defaults to
    /// `attachment; filename="<filename>"` and the policy lives for 60 seconds.
    pub fn new(key_prefix: &str, filename: &str, content_type: &str, size: u64) -> Self {
        Self {
            key_prefix: key_prefix.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            min_size: size,
            max_size: size,
            content_disposition: Some(format!("attachment; filename=\"{filename}\"")),
            max_age: Duration::from_secs(60),
        }
    }

    /// Accept any size between `min` and `max` bytes, both inclusive.
    pub fn with_size_range(mut self, min: u64, max: u64) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// Override the `Content-Disposition` the upload must carry.
    pub fn with_content_disposition(mut self, value: &str) -> Self {
        self.content_disposition = Some(value.to_string());
        self
    }

    /// Don't constrain `Content-Disposition`.
    pub fn without_content_disposition(mut self) -> Self {
        self.content_disposition = None;
        self
    }

    /// How long the policy stays valid.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Object key: prefix followed by filename.
    pub fn key(&self) -> String {
        format!("{}{}", self.key_prefix, self.filename)
    }

    fn check(&self) -> Result<()> {
        if self.key_prefix.starts_with('/') {
            return Err(Error::request_invalid(format!(
                "key prefix {:?} must not start with \"/\"",
                self.key_prefix
            )));
        }
        if !self.key_prefix.is_empty() && !self.key_prefix.ends_with('/') {
            return Err(Error::request_invalid(format!(
                "key prefix {:?} must end with \"/\"",
                self.key_prefix
            )));
        }
        if self.filename.is_empty() {
            return Err(Error::request_invalid("filename is empty"));
        }
        if self.min_size > self.max_size {
            return Err(Error::request_invalid(format!(
                "content length range {}..={} is empty",
                self.min_size, self.max_size
            )));
        }
        if self.max_age.as_secs() == 0 {
            return Err(Error::request_invalid(format!(
                "policy max age must be at least one second, got {:?}",
                self.max_age
            )));
        }
        Ok(())
    }
}

/// PostPolicyForm is what a browser needs to upload directly to S3: the URL to POST
/// to and the form fields to send along with the file, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPolicyForm {
    /// Bucket URL, ending with `/`.
    pub url: String,
    /// Form fields, in the order they must be submitted.
    pub fields: Vec<(String, String)>,
}

impl PostPolicyForm {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Serialize for PostPolicyForm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Fields<'a>(&'a [(String, String)]);

        impl Serialize for Fields<'_> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (k, v) in self.0 {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("url", &self.url)?;
        map.serialize_entry("fields", &Fields(&self.fields))?;
        map.end()
    }
}

#[derive(Serialize)]
struct PolicyDocument {
    expiration: String,
    conditions: Vec<Value>,
}

/// PostPolicy signs browser upload policies for one bucket.
///
/// - [Browser-based uploads using POST](https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-UsingHTTPPOST.html)
#[derive(Debug, Clone)]
pub struct PostPolicy {
    bucket: String,
    region: String,
    endpoint: Endpoint,
}

impl PostPolicy {
    /// Create a policy signer for the bucket, using the default S3 endpoint.
    pub fn new(bucket: &str, region: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            region: region.to_string(),
            endpoint: Endpoint::s3(bucket, region),
        }
    }

    /// Upload to a custom endpoint instead.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sign the upload policy at the time given by the context clock.
    pub fn presign(
        &self,
        ctx: &Context,
        cred: &Credential,
        upload: &Upload,
    ) -> Result<PostPolicyForm> {
        self.sign(cred, upload, ctx.now())
    }

    /// Sign the upload policy at the given time.
    pub fn sign(&self, cred: &Credential, upload: &Upload, now: DateTime) -> Result<PostPolicyForm> {
        cred.check()?;
        upload.check()?;

        let max_age = chrono::Duration::from_std(upload.max_age).map_err(|e| {
            Error::request_invalid(format!("policy max age {:?} is too large", upload.max_age))
                .with_source(e)
        })?;
        let expiration = now
            .checked_add_signed(max_age)
            .ok_or_else(|| Error::request_invalid("policy expiration is out of range"))?;

        let key = upload.key();
        let scope = scope(now, &self.region, "s3");
        let credential = format!("{}/{}", cred.access_key_id, scope);
        let date = format_iso8601(now);

        let mut conditions = vec![
            json!({ "bucket": self.bucket }),
            json!({ "key": key }),
            json!({ "content-type": upload.content_type }),
            json!(["content-length-range", upload.min_size, upload.max_size]),
        ];
        if let Some(disposition) = &upload.content_disposition {
            conditions.push(json!({ "Content-Disposition": disposition }));
        }
        conditions.push(json!({ "x-amz-algorithm": ALGORITHM }));
        conditions.push(json!({ "x-amz-credential": credential }));
        conditions.push(json!({ "x-amz-date": date }));
        if let Some(token) = &cred.session_token {
            conditions.push(json!({ "x-amz-security-token": token }));
        }

        let document = PolicyDocument {
            expiration: format_rfc3339(expiration),
            conditions,
        };
        let policy = serde_json::to_vec(&document).map_err(|e| {
            Error::unexpected("failed to serialize post policy").with_source(e)
        })?;
        let policy = base64_encode(&policy);
        debug!("calculated post policy for {key} with scope {scope}");

        let signature =
            SigningKey::derive(&cred.secret_access_key, now, &self.region, "s3").sign(&policy);

        let mut fields = vec![
            ("key".to_string(), key),
            ("Content-Type".to_string(), upload.content_type.clone()),
            ("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()),
            ("X-Amz-Credential".to_string(), credential),
            ("X-Amz-Date".to_string(), date),
        ];
        if let Some(disposition) = &upload.content_disposition {
            fields.push(("Content-Disposition".to_string(), disposition.clone()));
        }
        fields.push(("Policy".to_string(), policy));
        fields.push(("X-Amz-Signature".to_string(), signature));
        if let Some(token) = &cred.session_token {
            fields.push(("X-Amz-Security-Token".to_string(), token.clone()));
        }

        Ok(PostPolicyForm {
            url: format!("{}/", self.endpoint.url()),
            fields,
        })
    }
}
