use std::fmt::{Debug, Formatter};

use awssign_core::utils::Redact;
use awssign_core::{Context, Error, Result};

use crate::constants::*;
use crate::Endpoint;

/// Config for aws services.
#[derive(Clone, Default)]
pub struct Config {
    /// `region` will be loaded from:
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_REGION`]
    pub region: Option<String>,
    /// `access_key_id` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_ACCESS_KEY_ID`]
    pub access_key_id: Option<String>,
    /// `secret_access_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_SECRET_ACCESS_KEY`]
    pub secret_access_key: Option<String>,
    /// `session_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_SESSION_TOKEN`]
    pub session_token: Option<String>,
    /// `bucket` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_S3_BUCKET`]
    pub bucket: Option<String>,
    /// `endpoint` overrides the S3 endpoint derived from bucket and region.
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_ENDPOINT_URL`]
    pub endpoint: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("region", &self.region)
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Config {
    /// Load config from env.
    ///
    /// Values already set on this config win over the environment.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let envs = ctx.env_vars();

        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.is_none() {
                if let Some(v) = envs.get(key) {
                    *slot = Some(v.to_string());
                }
            }
        };

        fill(&mut self.region, AWS_REGION);
        fill(&mut self.access_key_id, AWS_ACCESS_KEY_ID);
        fill(&mut self.secret_access_key, AWS_SECRET_ACCESS_KEY);
        fill(&mut self.session_token, AWS_SESSION_TOKEN);
        fill(&mut self.bucket, AWS_S3_BUCKET);
        fill(&mut self.endpoint, AWS_ENDPOINT_URL);
        self
    }

    /// Region, or a config error when it is not set.
    pub fn region(&self) -> Result<&str> {
        match self.region.as_deref() {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(Error::config_invalid(format!(
                "region is not set, please configure {AWS_REGION}"
            ))),
        }
    }

    /// Resolve the S3 endpoint: the explicit endpoint first, then the bucket.
    pub fn s3_endpoint(&self) -> Result<Endpoint> {
        if let Some(endpoint) = &self.endpoint {
            return Endpoint::parse(endpoint);
        }

        match self.bucket.as_deref() {
            Some(bucket) if !bucket.is_empty() => Ok(Endpoint::s3(bucket, self.region()?)),
            _ => Err(Error::config_invalid(format!(
                "bucket is not set, please configure {AWS_S3_BUCKET} or {AWS_ENDPOINT_URL}"
            ))),
        }
    }
}
