use std::fmt;

use http::HeaderMap;
use thiserror::Error;

/// The error type for webhook verification.
///
/// Every error carries the headers of the request that was being verified so
/// callers can log or answer it without keeping the request around.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    details: Option<String>,
    headers: HeaderMap,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of webhook verification error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `SigningCertURL` or `SubscribeURL` does not point at SNS.
    UntrustedSource,

    /// Certificate or subscribe URL could not be fetched.
    FetchFailed,

    /// Fetched certificate is not a PEM encoded X.509 certificate with an RSA key.
    InvalidCertificate,

    /// Body is not valid JSON or misses a required field.
    MalformedInput,

    /// Signature does not match the message.
    SignatureMismatch,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            headers: HeaderMap::new(),
            source: None,
        }
    }

    /// Create an untrusted source error for `url`.
    pub fn untrusted_source(url: &str) -> Self {
        Self::new(
            ErrorKind::UntrustedSource,
            format!("invalid SigningCertURL {url:?}"),
        )
        .with_details(url)
    }

    /// Create a fetch failed error
    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FetchFailed, message)
    }

    /// Create an invalid certificate error
    pub fn invalid_certificate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCertificate, message)
    }

    /// Create a malformed input error
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput, message)
    }

    /// Create a signature mismatch error
    pub fn signature_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SignatureMismatch, message)
    }

    /// Attach details: the offending URL, field or HTTP status.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach the headers of the request being verified.
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        self.headers = headers.clone();
        self
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message without the kind prefix
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the details, if any.
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Get the headers of the rejected request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UntrustedSource => write!(f, "untrusted source"),
            ErrorKind::FetchFailed => write!(f, "fetch failed"),
            ErrorKind::InvalidCertificate => write!(f, "invalid certificate"),
            ErrorKind::MalformedInput => write!(f, "malformed input"),
            ErrorKind::SignatureMismatch => write!(f, "signature mismatch"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;
