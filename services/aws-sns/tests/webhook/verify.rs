use std::sync::Arc;

use super::*;
use awssign_aws_sns::{CertificateCache, ErrorKind, SignatureVersion, SnsMessage, WebhookVerifier};
use http::{HeaderMap, HeaderValue};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

/// Headers SNS sends along with `value`.
fn headers(value: &serde_json::Value) -> HeaderMap {
    let message_type = value["Type"].as_str().expect("Type must be set");
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-amz-sns-message-type",
        HeaderValue::from_str(message_type).expect("Type must be a valid header value"),
    );
    headers
}

#[test_case(SignatureVersion::V1; "sha1")]
#[test_case(SignatureVersion::V2; "sha256")]
#[tokio::test]
async fn test_verify_notification(version: SignatureVersion) -> anyhow::Result<()> {
    let http = MockHttpSend::sns();
    let ctx = init(&http);
    let verifier = WebhookVerifier::default();

    let value = sign(notification("Hello world!"), version);
    let payload = verifier
        .verify_webhook(&ctx, &body(&value), &headers(&value))
        .await?
        .expect("notification must be returned");

    assert_eq!(payload.request_data, value);
    assert_eq!(payload.message.message(), "Hello world!");
    assert!(matches!(payload.message, SnsMessage::Notification(_)));
    assert_eq!(http.requests(), vec![CERT_URL.to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_verify_in_two_phases() -> anyhow::Result<()> {
    let http = MockHttpSend::sns();
    let ctx = init(&http);
    let verifier = WebhookVerifier::default();

    let value = sign(notification("Hello"), SignatureVersion::V1);
    let validated = verifier.validate(&body(&value), &headers(&value))?;
    assert_eq!(validated.cert_url(), CERT_URL);
    assert!(http.requests().is_empty());

    let payload = verifier.verify(&ctx, validated).await?;
    assert_eq!(payload.message.message(), "Hello");
    Ok(())
}

#[test_case("http://sns.us-east-1.amazonaws.com/cert.pem"; "plain http")]
#[test_case("https://sns.us-east-1.amazonaws.com.attacker.com/cert.pem"; "suffix")]
#[test_case("https://attacker.com/cert.pem"; "other host")]
#[tokio::test]
async fn test_untrusted_cert_url_is_never_fetched(url: &str) {
    let http = MockHttpSend::sns().with_response(url, http::StatusCode::OK, CERT_PEM);
    let ctx = init(&http);

    let mut value = notification("Hello");
    value["SigningCertURL"] = json!(url);
    let value = sign(value, SignatureVersion::V1);

    let err = WebhookVerifier::default()
        .verify_webhook(&ctx, &body(&value), &headers(&value))
        .await
        .expect_err("must be rejected");
    assert_eq!(err.kind(), ErrorKind::UntrustedSource);
    assert_eq!(err.details(), Some(url));
    assert_eq!(err.headers(), &headers(&value));
    assert!(http.requests().is_empty());
}

#[test_case("Message", json!("Hello mallory"); "message")]
#[test_case("Timestamp", json!("2024-05-02T00:54:07.655Z"); "timestamp")]
#[test_case("Subject", json!("Other"); "subject")]
#[test_case("TopicArn", json!("arn:aws:sns:us-east-1:123456789012:other"); "topic")]
#[tokio::test]
async fn test_tampered_field_is_rejected(field: &str, tampered: serde_json::Value) {
    let http = MockHttpSend::sns();
    let ctx = init(&http);

    let mut value = sign(notification("Hello"), SignatureVersion::V1);
    value[field] = tampered;

    let err = WebhookVerifier::default()
        .verify_webhook(&ctx, &body(&value), &headers(&value))
        .await
        .expect_err("must be rejected");
    assert_eq!(err.kind(), ErrorKind::SignatureMismatch);
    assert_eq!(err.headers(), &headers(&value));
}

#[tokio::test]
async fn test_tampered_signature_is_rejected() {
    let http = MockHttpSend::sns();
    let ctx = init(&http);

    let value = sign(notification("Hello"), SignatureVersion::V1);
    let mut signature = awssign_core::hash::base64_decode(
        value["Signature"].as_str().expect("signature must be set"),
    )
    .expect("signature must be base64");
    signature[0] ^= 0x01;

    let mut tampered = value.clone();
    tampered["Signature"] = json!(awssign_core::hash::base64_encode(&signature));

    let err = WebhookVerifier::default()
        .verify_webhook(&ctx, &body(&tampered), &headers(&tampered))
        .await
        .expect_err("must be rejected");
    assert_eq!(err.kind(), ErrorKind::SignatureMismatch);
}

#[tokio::test]
async fn test_signature_from_other_key_is_rejected() {
    let http = MockHttpSend::sns();
    let ctx = init(&http);

    let value = sign_with(notification("Hello"), SignatureVersion::V2, OTHER_KEY_PEM);
    let err = WebhookVerifier::default()
        .verify_webhook(&ctx, &body(&value), &headers(&value))
        .await
        .expect_err("must be rejected");
    assert_eq!(err.kind(), ErrorKind::SignatureMismatch);
}

#[tokio::test]
async fn test_signature_version_must_match_digest() {
    let http = MockHttpSend::sns();
    let ctx = init(&http);

    let mut value = sign(notification("Hello"), SignatureVersion::V1);
    value["SignatureVersion"] = json!("2");

    let err = WebhookVerifier::default()
        .verify_webhook(&ctx, &body(&value), &headers(&value))
        .await
        .expect_err("must be rejected");
    assert_eq!(err.kind(), ErrorKind::SignatureMismatch);
}

#[tokio::test]
async fn test_confirmation_without_token_is_malformed() {
    let http = MockHttpSend::sns();
    let ctx = init(&http);

    let mut value = sign(subscription_confirmation(), SignatureVersion::V1);
    value
        .as_object_mut()
        .expect("must be object")
        .remove("Token");

    let err = WebhookVerifier::default()
        .verify_webhook(&ctx, &body(&value), &headers(&value))
        .await
        .expect_err("must be rejected");
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_subscription_confirmation_is_confirmed() -> anyhow::Result<()> {
    let http = MockHttpSend::sns();
    let ctx = init(&http);

    let value = sign(subscription_confirmation(), SignatureVersion::V1);
    let payload = WebhookVerifier::default()
        .verify_webhook(&ctx, &body(&value), &headers(&value))
        .await?;

    assert_eq!(payload, None);
    assert_eq!(
        http.requests(),
        vec![CERT_URL.to_string(), SUBSCRIBE_URL.to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_unsubscribe_confirmation_is_returned() -> anyhow::Result<()> {
    let http = MockHttpSend::sns();
    let ctx = init(&http);

    let mut value = subscription_confirmation();
    value["Type"] = json!("UnsubscribeConfirmation");
    let value = sign(value, SignatureVersion::V1);

    let payload = WebhookVerifier::default()
        .verify_webhook(&ctx, &body(&value), &headers(&value))
        .await?
        .expect("unsubscribe confirmation must be returned");
    assert!(matches!(
        payload.message,
        SnsMessage::UnsubscribeConfirmation(_)
    ));
    assert_eq!(http.count(SUBSCRIBE_URL), 0);
    Ok(())
}

#[tokio::test]
async fn test_untrusted_subscribe_url_is_not_visited() {
    let http = MockHttpSend::sns();
    let ctx = init(&http);

    let mut value = subscription_confirmation();
    value["SubscribeURL"] = json!("https://attacker.com/?Action=ConfirmSubscription");
    let value = sign(value, SignatureVersion::V1);

    let err = WebhookVerifier::new(Arc::new(CertificateCache::new()))
        .verify_webhook(&ctx, &body(&value), &headers(&value))
        .await
        .expect_err("must be rejected");
    assert_eq!(err.kind(), ErrorKind::UntrustedSource);
    assert_eq!(err.headers(), &headers(&value));
    assert_eq!(http.requests(), vec![CERT_URL.to_string()]);
}

#[tokio::test]
async fn test_failed_confirmation() {
    let http = MockHttpSend::default().with_response(CERT_URL, http::StatusCode::OK, CERT_PEM);
    let ctx = init(&http);

    let value = sign(subscription_confirmation(), SignatureVersion::V1);
    let err = WebhookVerifier::default()
        .verify_webhook(&ctx, &body(&value), &headers(&value))
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::FetchFailed);
    assert_eq!(err.details(), Some("404"));
}

#[test_case(notification("Hello"), "SubscriptionConfirmation"; "notification")]
#[test_case(subscription_confirmation(), "Notification"; "confirmation")]
#[tokio::test]
async fn test_mismatched_message_type_header_is_rejected(
    value: serde_json::Value,
    header: &'static str,
) {
    let http = MockHttpSend::sns();
    let ctx = init(&http);

    let value = sign(value, SignatureVersion::V1);
    let mut headers = HeaderMap::new();
    headers.insert("x-amz-sns-message-type", HeaderValue::from_static(header));

    let err = WebhookVerifier::default()
        .verify_webhook(&ctx, &body(&value), &headers)
        .await
        .expect_err("must be rejected");
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert_eq!(err.details(), Some("x-amz-sns-message-type"));
    assert_eq!(err.headers(), &headers);
    assert!(http.requests().is_empty());
}
