use std::sync::Arc;

use super::*;
use awssign_aws_sns::{Certificate, CertificateCache, ErrorKind, SignatureVersion, WebhookVerifier};
use http::{HeaderMap, StatusCode};

#[tokio::test]
async fn test_certificate_is_fetched_once() -> anyhow::Result<()> {
    let http = MockHttpSend::sns();
    let ctx = init(&http);
    let cache = Arc::new(CertificateCache::new());
    let verifier = WebhookVerifier::new(cache.clone());

    for message in ["one", "two", "three"] {
        let value = sign(notification(message), SignatureVersion::V1);
        verifier
            .verify_webhook(&ctx, &body(&value), &HeaderMap::new())
            .await?;
    }

    assert_eq!(http.count(CERT_URL), 1);
    assert_eq!(cache.len(), 1);

    // A second verifier sharing the cache doesn't fetch either.
    let other = WebhookVerifier::new(cache.clone());
    let value = sign(notification("four"), SignatureVersion::V2);
    other
        .verify_webhook(&ctx, &body(&value), &HeaderMap::new())
        .await?;
    assert_eq!(http.count(CERT_URL), 1);

    cache.clear();
    assert!(cache.is_empty());
    verifier
        .verify_webhook(&ctx, &body(&value), &HeaderMap::new())
        .await?;
    assert_eq!(http.count(CERT_URL), 2);
    Ok(())
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let http = MockHttpSend::default().with_response(CERT_URL, StatusCode::SERVICE_UNAVAILABLE, "");
    let ctx = init(&http);
    let cache = CertificateCache::new();

    for _ in 0..2 {
        let err = cache
            .get(&ctx, CERT_URL)
            .await
            .expect_err("fetch must fail");
        assert_eq!(err.kind(), ErrorKind::FetchFailed);
        assert_eq!(err.details(), Some("503"));
    }

    assert!(cache.is_empty());
    assert_eq!(http.count(CERT_URL), 2);
}

#[tokio::test]
async fn test_invalid_certificate_is_not_cached() {
    let http = MockHttpSend::default().with_response(CERT_URL, StatusCode::OK, "<html>oops</html>");
    let ctx = init(&http);
    let cache = CertificateCache::new();

    let err = cache
        .get(&ctx, CERT_URL)
        .await
        .expect_err("certificate must be rejected");
    assert_eq!(err.kind(), ErrorKind::InvalidCertificate);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_transport_error_is_fetch_failed() {
    // The default context has no http client configured.
    let _ = env_logger::builder().is_test(true).try_init();
    let ctx = awssign_core::Context::new();

    let err = CertificateCache::new()
        .get(&ctx, CERT_URL)
        .await
        .expect_err("fetch must fail");
    assert_eq!(err.kind(), ErrorKind::FetchFailed);
}

#[tokio::test]
async fn test_preseeded_certificate() -> anyhow::Result<()> {
    let http = MockHttpSend::default();
    let ctx = init(&http);
    let cache = Arc::new(CertificateCache::new());

    let cert = cache.insert(Certificate::from_pem(CERT_URL, CERT_PEM)?);
    assert_eq!(cert.url(), CERT_URL);
    assert_eq!(cert.pem(), CERT_PEM);

    let value = sign(notification("Hello"), SignatureVersion::V1);
    WebhookVerifier::new(cache)
        .verify_webhook(&ctx, &body(&value), &HeaderMap::new())
        .await?;
    assert!(http.requests().is_empty());
    Ok(())
}
