mod cache;
mod verify;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use awssign_aws_sns::{SignatureVersion, SnsMessage};
use awssign_core::hash::base64_encode;
use awssign_core::{Context, HttpSend};
use bytes::Bytes;
use http::StatusCode;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use sha1::Sha1;
use sha2::Sha256;

pub const CERT_PEM: &str = include_str!("../fixtures/cert.pem");
pub const KEY_PEM: &str = include_str!("../fixtures/key.pem");
pub const OTHER_KEY_PEM: &str = include_str!("../fixtures/other_key.pem");

pub const CERT_URL: &str =
    "https://sns.us-east-1.amazonaws.com/SimpleNotificationService-0000000000000000000000.pem";
pub const SUBSCRIBE_URL: &str =
    "https://sns.us-east-1.amazonaws.com/?Action=ConfirmSubscription&TopicArn=arn:aws:sns:us-east-1:123456789012:topic&Token=2336412f37";

/// MockHttpSend serves canned responses and records every URL requested.
#[derive(Debug, Clone, Default)]
pub struct MockHttpSend {
    responses: Arc<Mutex<HashMap<String, (StatusCode, Bytes)>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockHttpSend {
    pub fn with_response(self, url: &str, status: StatusCode, body: &str) -> Self {
        self.responses
            .lock()
            .expect("lock must not be poisoned")
            .insert(url.to_string(), (status, Bytes::from(body.to_string())));
        self
    }

    /// Serve the test certificate at [`CERT_URL`] and accept subscriptions.
    pub fn sns() -> Self {
        Self::default()
            .with_response(CERT_URL, StatusCode::OK, CERT_PEM)
            .with_response(SUBSCRIBE_URL, StatusCode::OK, "<ConfirmSubscriptionResponse/>")
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("lock must not be poisoned")
            .clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests().iter().filter(|v| *v == url).count()
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
    ) -> awssign_core::Result<http::Response<Bytes>> {
        let url = req.uri().to_string();
        self.requests
            .lock()
            .expect("lock must not be poisoned")
            .push(url.clone());

        let (status, body) = self
            .responses
            .lock()
            .expect("lock must not be poisoned")
            .get(&url)
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, Bytes::new()));

        Ok(http::Response::builder()
            .status(status)
            .body(body)
            .expect("response must be valid"))
    }
}

pub fn init(http: &MockHttpSend) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();
    Context::new().with_http_send(http.clone())
}

pub fn notification(message: &str) -> Value {
    json!({
        "Type": "Notification",
        "MessageId": "22b80b92-fdea-4c2c-8f9d-bdfb0c7bf324",
        "TopicArn": "arn:aws:sns:us-east-1:123456789012:topic",
        "Subject": "Greeting",
        "Message": message,
        "Timestamp": "2024-05-02T00:54:06.655Z",
        "SignatureVersion": "1",
        "Signature": "",
        "SigningCertURL": CERT_URL,
        "UnsubscribeURL": "https://sns.us-east-1.amazonaws.com/?Action=Unsubscribe"
    })
}

pub fn subscription_confirmation() -> Value {
    json!({
        "Type": "SubscriptionConfirmation",
        "MessageId": "165545c9-2a5c-472c-8df2-7ff2be2b3b1b",
        "Token": "2336412f37",
        "TopicArn": "arn:aws:sns:us-east-1:123456789012:topic",
        "Message": "You have chosen to subscribe to the topic.",
        "SubscribeURL": SUBSCRIBE_URL,
        "Timestamp": "2024-05-02T00:45:04.751Z",
        "SignatureVersion": "1",
        "Signature": "",
        "SigningCertURL": CERT_URL
    })
}

/// Sign `value` in place the way SNS does, with the given key.
pub fn sign_with(mut value: Value, version: SignatureVersion, key_pem: &str) -> Value {
    value["SignatureVersion"] = json!(match version {
        SignatureVersion::V1 => "1",
        SignatureVersion::V2 => "2",
    });

    let canonical = SnsMessage::from_value(value.clone())
        .expect("message must be valid")
        .canonical_string();
    let key = RsaPrivateKey::from_pkcs8_pem(key_pem).expect("key must be valid");
    let signature = match version {
        SignatureVersion::V1 => SigningKey::<Sha1>::new(key)
            .sign(canonical.as_bytes())
            .to_vec(),
        SignatureVersion::V2 => SigningKey::<Sha256>::new(key)
            .sign(canonical.as_bytes())
            .to_vec(),
    };

    value["Signature"] = json!(base64_encode(&signature));
    value
}

pub fn sign(value: Value, version: SignatureVersion) -> Value {
    sign_with(value, version, KEY_PEM)
}

pub fn body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).expect("body must serialize")
}
