use std::sync::Arc;

use awssign_core::hash::base64_decode;
use awssign_core::Context;
use http::{HeaderMap, Uri};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::certificate::fetch;
use crate::constants::{SNS_HOST_PATTERN, X_AMZ_SNS_MESSAGE_TYPE};
use crate::message::{SignatureVersion, SnsMessage};
use crate::{CertificateCache, Error, Result};

static SNS_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(SNS_HOST_PATTERN).expect("sns host pattern must be valid"));

/// SnsPayload is a verified webhook: the typed message and the raw JSON it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SnsPayload {
    /// Typed message.
    pub message: SnsMessage,
    /// Raw JSON body as received.
    pub request_data: serde_json::Value,
}

/// ValidatedMessage is a parsed webhook whose certificate URL is trusted.
///
/// The signature has not been checked yet; pass it to [`WebhookVerifier::verify`].
#[derive(Debug, Clone)]
pub struct ValidatedMessage {
    payload: SnsPayload,
    cert_url: String,
    version: SignatureVersion,
    signature: Vec<u8>,
    headers: HeaderMap,
}

impl ValidatedMessage {
    /// Trusted `SigningCertURL`.
    pub fn cert_url(&self) -> &str {
        &self.cert_url
    }

    /// Parsed message awaiting signature verification.
    pub fn message(&self) -> &SnsMessage {
        &self.payload.message
    }
}

/// WebhookVerifier checks SNS webhook signatures.
///
/// - [Verifying the signatures of Amazon SNS messages](https://docs.aws.amazon.com/sns/latest/dg/sns-verify-signature-of-message.html)
#[derive(Debug, Clone, Default)]
pub struct WebhookVerifier {
    cache: Arc<CertificateCache>,
}

impl WebhookVerifier {
    /// Create a verifier sharing the given certificate cache.
    pub fn new(cache: Arc<CertificateCache>) -> Self {
        Self { cache }
    }

    /// Certificate cache shared by this verifier.
    pub fn cache(&self) -> &CertificateCache {
        &self.cache
    }

    /// Parse the body and check everything that can be checked without I/O.
    ///
    /// An `x-amz-sns-message-type` header, when present, must equal the body `Type`.
    /// The certificate URL must be `https` on an SNS host, the signature must be
    /// base64 and the signature version must be `1` or `2`.
    pub fn validate(&self, body: &[u8], headers: &HeaderMap) -> Result<ValidatedMessage> {
        let request_data: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
            Error::malformed_input("invalid JSON")
                .with_headers(headers)
                .with_source(e)
        })?;
        let message = SnsMessage::from_value(request_data.clone()).map_err(|e| {
            warn!("invalid SNS webhook payload: {e}");
            e.with_headers(headers)
        })?;

        if let Some(value) = headers.get(X_AMZ_SNS_MESSAGE_TYPE) {
            if value.as_bytes() != message.message_type().as_bytes() {
                warn!(
                    "SNS webhook header {X_AMZ_SNS_MESSAGE_TYPE} {value:?} does not match Type {}",
                    message.message_type()
                );
                return Err(Error::malformed_input(format!(
                    "{X_AMZ_SNS_MESSAGE_TYPE} header does not match message Type {}",
                    message.message_type()
                ))
                .with_details(X_AMZ_SNS_MESSAGE_TYPE)
                .with_headers(headers));
            }
        }

        let cert_url = message.signing_cert_url();
        if !is_sns_url(cert_url) {
            warn!("rejected SNS webhook with SigningCertURL {cert_url:?}");
            return Err(Error::untrusted_source(cert_url).with_headers(headers));
        }

        let version = message
            .signature_version()
            .parse::<SignatureVersion>()
            .map_err(|e| e.with_headers(headers))?;
        let signature = base64_decode(message.signature()).map_err(|e| {
            Error::malformed_input("Signature is not valid base64")
                .with_details("Signature")
                .with_headers(headers)
                .with_source(e)
        })?;

        Ok(ValidatedMessage {
            cert_url: cert_url.to_string(),
            payload: SnsPayload {
                message,
                request_data,
            },
            version,
            signature,
            headers: headers.clone(),
        })
    }

    /// Fetch the certificate and verify the signature.
    pub async fn verify(&self, ctx: &Context, validated: ValidatedMessage) -> Result<SnsPayload> {
        let ValidatedMessage {
            payload,
            cert_url,
            version,
            signature,
            headers,
        } = validated;

        let cert = self
            .cache
            .get(ctx, &cert_url)
            .await
            .map_err(|e| e.with_headers(&headers))?;

        let canonical = payload.message.canonical_string();
        debug!("calculated SNS canonical string: {canonical:?}");

        cert.verify(version, canonical.as_bytes(), &signature)
            .map_err(|e| {
                warn!(
                    "invalid signature on SNS message {}",
                    payload.message.message_id()
                );
                e.with_headers(&headers)
            })?;

        Ok(payload)
    }

    /// Validate and verify a webhook body.
    ///
    /// A verified `SubscriptionConfirmation` is confirmed right away and yields
    /// `None`; other messages are returned.
    pub async fn verify_webhook(
        &self,
        ctx: &Context,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<Option<SnsPayload>> {
        let validated = self.validate(body, headers)?;
        let payload = self.verify(ctx, validated).await?;

        if let SnsMessage::SubscriptionConfirmation(_) = payload.message {
            self.confirm_subscription(ctx, &payload)
                .await
                .map_err(|e| e.with_headers(headers))?;
            return Ok(None);
        }

        Ok(Some(payload))
    }

    /// Confirm a subscription by visiting its `SubscribeURL`.
    ///
    /// The URL must pass the same host check as certificate URLs.
    pub async fn confirm_subscription(&self, ctx: &Context, payload: &SnsPayload) -> Result<()> {
        let Some(url) = payload.message.subscribe_url() else {
            return Err(Error::malformed_input("message has no SubscribeURL")
                .with_details("SubscribeURL"));
        };
        if !is_sns_url(url) {
            warn!("rejected SNS SubscribeURL {url:?}");
            return Err(Error::untrusted_source(url));
        }

        info!("confirming aws subscription to {}", url);
        fetch(ctx, url).await?;
        Ok(())
    }
}

/// Check that `url` is `https` on an SNS host.
pub fn is_sns_url(url: &str) -> bool {
    let Ok(uri) = url.parse::<Uri>() else {
        return false;
    };
    if uri.scheme_str() != Some("https") {
        return false;
    }
    if !matches!(uri.port_u16(), None | Some(443)) {
        return false;
    }
    match uri.authority() {
        // Userinfo is not part of a trusted SNS URL.
        Some(authority) if authority.as_str().contains('@') => false,
        Some(_) => uri.host().is_some_and(|host| SNS_HOST.is_match(host)),
        None => false,
    }
}
