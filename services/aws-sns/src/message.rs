use std::fmt::Write;
use std::str::FromStr;

use serde::Deserialize;

use crate::constants::*;
use crate::{Error, Result};

/// SnsMessage is an SNS webhook body, keyed by its `Type` field.
///
/// Every variant requires the fields that take part in its signature, so a
/// message that deserializes can always be canonicalized. Unknown fields are
/// ignored, unknown types are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "Type")]
pub enum SnsMessage {
    /// A message published to the topic.
    Notification(Notification),
    /// Sent when an endpoint is subscribed; visit `SubscribeURL` to confirm.
    SubscriptionConfirmation(Confirmation),
    /// Sent when an endpoint is unsubscribed.
    UnsubscribeConfirmation(Confirmation),
}

/// A message published to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Notification {
    /// `MessageId`.
    pub message_id: String,
    /// `TopicArn` the message was published to.
    pub topic_arn: String,
    /// `Subject`, if the publisher set one.
    #[serde(default)]
    pub subject: Option<String>,
    /// `Message` body as published.
    pub message: String,
    /// `Timestamp` in RFC 3339.
    pub timestamp: String,
    /// `SignatureVersion`, `1` or `2`.
    pub signature_version: String,
    /// Base64 `Signature`.
    pub signature: String,
    /// `SigningCertURL`.
    #[serde(rename = "SigningCertURL")]
    pub signing_cert_url: String,
    /// `UnsubscribeURL`.
    #[serde(rename = "UnsubscribeURL", default)]
    pub unsubscribe_url: Option<String>,
}

/// A subscription or unsubscribe confirmation request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Confirmation {
    /// `MessageId`.
    pub message_id: String,
    /// `Token` used to confirm the subscription.
    pub token: String,
    /// `TopicArn` of the subscription.
    pub topic_arn: String,
    /// Human readable `Message`.
    pub message: String,
    /// `SubscribeURL`.
    #[serde(rename = "SubscribeURL")]
    pub subscribe_url: String,
    /// `Timestamp` in RFC 3339.
    pub timestamp: String,
    /// `SignatureVersion`, `1` or `2`.
    pub signature_version: String,
    /// Base64 `Signature`.
    pub signature: String,
    /// `SigningCertURL`.
    #[serde(rename = "SigningCertURL")]
    pub signing_cert_url: String,
}

/// Digest used for the RSA signature, selected by `SignatureVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVersion {
    /// `1`: SHA1 with RSA.
    V1,
    /// `2`: SHA256 with RSA.
    V2,
}

impl FromStr for SignatureVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1" => Ok(SignatureVersion::V1),
            "2" => Ok(SignatureVersion::V2),
            v => Err(
                Error::malformed_input(format!("unsupported SignatureVersion {v:?}"))
                    .with_details("SignatureVersion"),
            ),
        }
    }
}

impl SnsMessage {
    /// Parse a message from its JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            Error::malformed_input(format!("invalid SNS message: {e}")).with_source(e)
        })
    }

    /// Value of the `Type` field.
    pub fn message_type(&self) -> &'static str {
        match self {
            SnsMessage::Notification(_) => NOTIFICATION,
            SnsMessage::SubscriptionConfirmation(_) => SUBSCRIPTION_CONFIRMATION,
            SnsMessage::UnsubscribeConfirmation(_) => UNSUBSCRIBE_CONFIRMATION,
        }
    }

    /// Value of the `MessageId` field.
    pub fn message_id(&self) -> &str {
        match self {
            SnsMessage::Notification(n) => &n.message_id,
            SnsMessage::SubscriptionConfirmation(c) | SnsMessage::UnsubscribeConfirmation(c) => {
                &c.message_id
            }
        }
    }

    /// Value of the `Message` field.
    pub fn message(&self) -> &str {
        match self {
            SnsMessage::Notification(n) => &n.message,
            SnsMessage::SubscriptionConfirmation(c) | SnsMessage::UnsubscribeConfirmation(c) => {
                &c.message
            }
        }
    }

    /// Base64 `Signature`.
    pub fn signature(&self) -> &str {
        match self {
            SnsMessage::Notification(n) => &n.signature,
            SnsMessage::SubscriptionConfirmation(c) | SnsMessage::UnsubscribeConfirmation(c) => {
                &c.signature
            }
        }
    }

    /// Value of the `SignatureVersion` field.
    pub fn signature_version(&self) -> &str {
        match self {
            SnsMessage::Notification(n) => &n.signature_version,
            SnsMessage::SubscriptionConfirmation(c) | SnsMessage::UnsubscribeConfirmation(c) => {
                &c.signature_version
            }
        }
    }

    /// Value of the `SigningCertURL` field.
    pub fn signing_cert_url(&self) -> &str {
        match self {
            SnsMessage::Notification(n) => &n.signing_cert_url,
            SnsMessage::SubscriptionConfirmation(c) | SnsMessage::UnsubscribeConfirmation(c) => {
                &c.signing_cert_url
            }
        }
    }

    /// `SubscribeURL` of a confirmation; notifications have none.
    pub fn subscribe_url(&self) -> Option<&str> {
        match self {
            SnsMessage::Notification(_) => None,
            SnsMessage::SubscriptionConfirmation(c) | SnsMessage::UnsubscribeConfirmation(c) => {
                Some(&c.subscribe_url)
            }
        }
    }

    /// Build the string SNS signed.
    ///
    /// Each field is written as `name\nvalue\n` in the fixed order of its type.
    /// An empty or missing `Subject` is left out.
    pub fn canonical_string(&self) -> String {
        let mut s = String::new();
        let mut push = |name: &str, value: &str| {
            // Writing into a String never fails.
            let _ = write!(s, "{name}\n{value}\n");
        };

        match self {
            SnsMessage::Notification(n) => {
                push("Message", &n.message);
                push("MessageId", &n.message_id);
                if let Some(subject) = n.subject.as_deref().filter(|v| !v.is_empty()) {
                    push("Subject", subject);
                }
                push("Timestamp", &n.timestamp);
                push("TopicArn", &n.topic_arn);
            }
            SnsMessage::SubscriptionConfirmation(c) | SnsMessage::UnsubscribeConfirmation(c) => {
                push("Message", &c.message);
                push("MessageId", &c.message_id);
                push("SubscribeURL", &c.subscribe_url);
                push("Timestamp", &c.timestamp);
                push("Token", &c.token);
                push("TopicArn", &c.topic_arn);
            }
        }
        push("Type", self.message_type());

        s
    }
}
