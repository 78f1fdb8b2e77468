//! AWS SNS webhook verification for awssign.
//!
//! SNS signs every message it delivers over HTTP(S) with the key of a
//! certificate it hosts. [`WebhookVerifier`] checks that the certificate comes
//! from SNS, fetches it through the [`Context`](awssign_core::Context) once per
//! URL and verifies the signature. [`SesWebhookInfo`] extracts SES events from
//! verified notifications.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use awssign_aws_sns::{CertificateCache, WebhookVerifier};
//! use awssign_core::Context;
//!
//! # async fn example(body: &[u8], headers: &http::HeaderMap) -> awssign_aws_sns::Result<()> {
//! // Needs an `HttpSend` implementation to fetch certificates.
//! let ctx = Context::new();
//! let verifier = WebhookVerifier::new(Arc::new(CertificateCache::new()));
//!
//! if let Some(payload) = verifier.verify_webhook(&ctx, body, headers).await? {
//!     println!("verified {}", payload.message.message_id());
//! }
//! # Ok(())
//! # }
//! ```

mod constants;
pub use constants::X_AMZ_SNS_MESSAGE_TYPE;

mod error;
pub use error::{Error, ErrorKind, Result};

mod message;
pub use message::{Confirmation, Notification, SignatureVersion, SnsMessage};

mod certificate;
pub use certificate::{Certificate, CertificateCache};

mod verify;
pub use verify::{is_sns_url, SnsPayload, ValidatedMessage, WebhookVerifier};

mod ses;
pub use ses::SesWebhookInfo;
