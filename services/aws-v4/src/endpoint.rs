use std::fmt::{Display, Formatter};

use awssign_core::{Error, Result};
use http::Uri;
use percent_encoding::utf8_percent_encode;

use crate::constants::AWS_URI_ENCODE_SET;

/// Endpoint is the base URL requests are sent to, without a trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
}

impl Endpoint {
    /// S3 bucket endpoint.
    ///
    /// A bucket name containing `.` is taken as a CNAME and used as the host
    /// directly, otherwise the virtual hosted style
    /// `<bucket>.s3.<region>.amazonaws.com` is used.
    pub fn s3(bucket: &str, region: &str) -> Self {
        let host = if bucket.contains('.') {
            bucket.to_string()
        } else {
            format!("{bucket}.s3.{region}.amazonaws.com")
        };
        Self {
            url: format!("https://{host}"),
        }
    }

    /// SES endpoint: `email.<region>.amazonaws.com`.
    pub fn ses(region: &str) -> Self {
        Self {
            url: format!("https://email.{region}.amazonaws.com"),
        }
    }

    /// SNS endpoint: `sns.<region>.amazonaws.com`.
    pub fn sns(region: &str) -> Self {
        Self {
            url: format!("https://sns.{region}.amazonaws.com"),
        }
    }

    /// Use an explicit URL, for S3 compatible services or local testing.
    ///
    /// The URL must be `http` or `https` and carry a host. Any path is kept,
    /// trailing `/` are dropped.
    pub fn parse(url: &str) -> Result<Self> {
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::config_invalid(format!("invalid endpoint {url:?}")).with_source(e))?;

        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            _ => {
                return Err(Error::config_invalid(format!(
                    "endpoint {url:?} must use http or https"
                )))
            }
        }
        match uri.host() {
            Some(h) if !h.is_empty() => {}
            _ => {
                return Err(Error::config_invalid(format!(
                    "endpoint {url:?} must have a host"
                )))
            }
        }
        if uri.query().is_some() {
            return Err(Error::config_invalid(format!(
                "endpoint {url:?} must not have a query"
            )));
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without a trailing `/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL of an object under this endpoint.
    ///
    /// The key is percent-encoded with `/` kept; a leading `/` is ignored.
    pub fn object_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        format!(
            "{}/{}",
            self.url,
            utf8_percent_encode(key, &AWS_URI_ENCODE_SET)
        )
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}
