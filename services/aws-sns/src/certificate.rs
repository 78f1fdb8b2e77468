use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

use awssign_core::Context;
use bytes::Bytes;
use http::StatusCode;
use log::{debug, warn};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha1::Sha1;
use sha2::Sha256;
use x509_cert::der::{Decode, Encode};

use crate::message::SignatureVersion;
use crate::{Error, Result};

/// Certificate is an SNS signing certificate and the RSA key it carries.
#[derive(Clone)]
pub struct Certificate {
    url: String,
    pem: String,
    public_key: RsaPublicKey,
}

impl Debug for Certificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Certificate {
    /// Parse a PEM encoded X.509 certificate fetched from `url`.
    ///
    /// Only the leaf certificate is read; its chain is not validated.
    pub fn from_pem(url: &str, pem: &str) -> Result<Self> {
        let parsed = pem::parse(pem).map_err(|e| {
            Error::invalid_certificate(format!("failed to parse PEM from {url}")).with_source(e)
        })?;
        if parsed.tag() != "CERTIFICATE" {
            return Err(Error::invalid_certificate(format!(
                "PEM from {url} does not contain a certificate"
            )));
        }

        let cert = x509_cert::Certificate::from_der(parsed.contents()).map_err(|e| {
            Error::invalid_certificate(format!("failed to parse X.509 certificate from {url}"))
                .with_source(anyhow::anyhow!("{e}"))
        })?;
        let spki = cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| {
                Error::invalid_certificate("failed to encode subject public key info")
                    .with_source(anyhow::anyhow!("{e}"))
            })?;
        let public_key = RsaPublicKey::from_public_key_der(&spki).map_err(|e| {
            Error::invalid_certificate(format!("certificate from {url} has no RSA public key"))
                .with_source(anyhow::anyhow!("{e}"))
        })?;

        Ok(Self {
            url: url.to_string(),
            pem: pem.to_string(),
            public_key,
        })
    }

    /// URL the certificate was fetched from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Original PEM text.
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// RSA public key of the certificate.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Verify an RSA PKCS#1 v1.5 signature over `message`.
    pub fn verify(&self, version: SignatureVersion, message: &[u8], signature: &[u8]) -> Result<()> {
        let signature = Signature::try_from(signature).map_err(|e| {
            Error::signature_mismatch("signature is not a valid RSA signature")
                .with_source(anyhow::anyhow!("{e}"))
        })?;

        let verified = match version {
            SignatureVersion::V1 => {
                VerifyingKey::<Sha1>::new(self.public_key.clone()).verify(message, &signature)
            }
            SignatureVersion::V2 => {
                VerifyingKey::<Sha256>::new(self.public_key.clone()).verify(message, &signature)
            }
        };

        verified.map_err(|e| {
            Error::signature_mismatch("invalid signature").with_source(anyhow::anyhow!("{e}"))
        })
    }
}

/// CertificateCache keeps parsed signing certificates by URL.
///
/// The cache is owned by the application and shared with `Arc`. Only
/// successfully parsed certificates are stored. The lock is never held while
/// fetching, so concurrent misses on one URL may fetch twice; the last write wins.
#[derive(Default)]
pub struct CertificateCache {
    certs: RwLock<HashMap<String, Arc<Certificate>>>,
}

impl Debug for CertificateCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateCache")
            .field("len", &self.len())
            .finish()
    }
}

impl CertificateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the certificate for `url`, fetching it through the context on a miss.
    ///
    /// The caller must have checked that `url` is trusted.
    pub async fn get(&self, ctx: &Context, url: &str) -> Result<Arc<Certificate>> {
        if let Some(cert) = self.cached(url) {
            debug!("certificate cache hit for {url}");
            return Ok(cert);
        }

        debug!("fetching signing certificate from {url}");
        let body = fetch(ctx, url).await?;
        let pem = String::from_utf8(body.to_vec()).map_err(|e| {
            Error::invalid_certificate(format!("certificate from {url} is not valid UTF-8"))
                .with_source(e)
        })?;
        let cert = Certificate::from_pem(url, &pem)?;

        Ok(self.insert(cert))
    }

    /// Store a certificate under its URL, replacing any previous entry.
    pub fn insert(&self, cert: Certificate) -> Arc<Certificate> {
        let cert = Arc::new(cert);
        self.certs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cert.url().to_string(), cert.clone());
        cert
    }

    /// Drop every cached certificate.
    pub fn clear(&self) {
        self.certs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached certificates.
    pub fn len(&self) -> usize {
        self.certs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache holds no certificate.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, url: &str) -> Option<Arc<Certificate>> {
        self.certs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }
}

/// GET `url` through the context and require a 200 response.
pub(crate) async fn fetch(ctx: &Context, url: &str) -> Result<Bytes> {
    let req = http::Request::get(url).body(Bytes::new()).map_err(|e| {
        Error::fetch_failed(format!("failed to build request for {url}")).with_source(e)
    })?;

    let resp = ctx.http_send(req).await.map_err(|e| {
        Error::fetch_failed(format!("failed to fetch {url}"))
            .with_details(url)
            .with_source(e)
    })?;

    if resp.status() != StatusCode::OK {
        warn!("unexpected response from GET {url}, {}", resp.status());
        return Err(Error::fetch_failed(format!(
            "unexpected response from {url:?}, {}",
            resp.status().as_u16()
        ))
        .with_details(resp.status().as_u16().to_string()));
    }

    Ok(resp.into_body())
}
