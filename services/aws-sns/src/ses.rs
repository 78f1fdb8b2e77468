use std::collections::HashMap;

use awssign_core::time::{parse_rfc3339, DateTime};
use awssign_core::Context;
use http::HeaderMap;
use log::warn;
use serde_json::Value;

use crate::constants::SES_EVENT_TYPES;
use crate::{Error, Result, SnsPayload, WebhookVerifier};

/// SesWebhookInfo is an SES event delivered through an SNS notification.
#[derive(Debug, Clone, PartialEq)]
pub struct SesWebhookInfo {
    /// `mail.messageId` of the email the event is about.
    pub message_id: String,
    /// Lower-cased `eventType`: `send`, `delivery`, `open`, `click`, `bounce`, `complaint`.
    pub event_type: String,
    /// Timestamp of the event, falling back to the time the mail was sent.
    pub timestamp: Option<DateTime>,
    /// Whether the recipient should no longer be mailed: a permanent bounce or any complaint.
    pub unsubscribe: bool,
    /// Event specific object, e.g. the `bounce` or `click` details.
    pub details: Value,
    /// First value of every `mail.tags` entry.
    pub tags: HashMap<String, String>,
    /// The whole SES event.
    pub full_message: Value,
    /// The raw SNS webhook body.
    pub request_data: Value,
}

impl SesWebhookInfo {
    /// Verify an SNS webhook and extract the SES event it carries.
    ///
    /// Returns `None` for subscription confirmations and for notifications whose
    /// message is not JSON.
    pub async fn build(
        verifier: &WebhookVerifier,
        ctx: &Context,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<Option<Self>> {
        match verifier.verify_webhook(ctx, body, headers).await? {
            Some(payload) => Self::from_payload(&payload).map_err(|e| e.with_headers(headers)),
            None => Ok(None),
        }
    }

    /// Extract the SES event from an already verified payload.
    pub fn from_payload(payload: &SnsPayload) -> Result<Option<Self>> {
        let message: Value = match serde_json::from_str(payload.message.message()) {
            Ok(v) => v,
            Err(_) => {
                warn!(
                    "invalid JSON in SNS notification {}",
                    payload.message.message_id()
                );
                return Ok(None);
            }
        };

        let event_type = message
            .get("eventType")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::malformed_input("SES event has no eventType").with_details("eventType")
            })?
            .to_lowercase();
        if !SES_EVENT_TYPES.contains(&event_type.as_str()) {
            warn!(
                "unknown aws webhook event {event_type} in SNS notification {}",
                payload.message.message_id()
            );
        }

        let mail = message.get("mail").cloned().unwrap_or(Value::Null);
        let message_id = mail
            .get("messageId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::malformed_input("SES event has no mail.messageId")
                    .with_details("mail.messageId")
            })?
            .to_string();

        let details = match message.get(&event_type) {
            Some(v) if !v.is_null() => v.clone(),
            _ => Value::Object(Default::default()),
        };

        let timestamp = match details
            .get("timestamp")
            .and_then(Value::as_str)
            .or_else(|| mail.get("timestamp").and_then(Value::as_str))
        {
            Some(ts) => Some(parse_rfc3339(ts).map_err(|e| {
                Error::malformed_input(format!("invalid SES timestamp {ts:?}"))
                    .with_details("timestamp")
                    .with_source(e)
            })?),
            None => None,
        };

        let unsubscribe = match event_type.as_str() {
            "bounce" => details.get("bounceType").and_then(Value::as_str) == Some("Permanent"),
            "complaint" => true,
            _ => false,
        };

        let tags = mail
            .get("tags")
            .and_then(Value::as_object)
            .map(|tags| {
                tags.iter()
                    .filter_map(|(k, v)| {
                        v.get(0)
                            .and_then(Value::as_str)
                            .map(|v| (k.clone(), v.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(Self {
            message_id,
            event_type,
            timestamp,
            unsubscribe,
            details,
            tags,
            full_message: message,
            request_data: payload.request_data.clone(),
        }))
    }
}
