use std::env;
use std::time::Duration;

use anyhow::Result;
use awssign_aws_v4::{Config, ConfigCredentialProvider, PresignedGet, RequestSigner};
use awssign_core::{Context, OsEnv, Signer};
use awssign_http_send_reqwest::ReqwestHttpSend;
use bytes::Bytes;
use http::{Request, StatusCode};
use log::{debug, warn};

/// Build a context and config against a real bucket.
///
/// Only runs when `AWSSIGN_AWS_V4_TEST=on`, values come from the usual
/// `AWS_*` variables (a `.env` file is honored).
fn init_live_test() -> Option<(Context, Config)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("AWSSIGN_AWS_V4_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let ctx = Context::new()
        .with_env(OsEnv)
        .with_http_send(ReqwestHttpSend::default());
    let config = Config::default().from_env(&ctx);
    Some((ctx, config))
}

#[tokio::test]
async fn test_head_not_exist_object() -> Result<()> {
    let Some((ctx, config)) = init_live_test() else {
        warn!("AWSSIGN_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let endpoint = config.s3_endpoint()?;
    let region = config.region()?.to_string();
    let signer = Signer::new(
        ctx.clone(),
        ConfigCredentialProvider::new(config.into()),
        RequestSigner::new("s3", &region),
    );

    let (mut parts, _) = Request::head(endpoint.object_url("not_exist_file"))
        .body(())?
        .into_parts();
    signer.sign(&mut parts, None).await?;
    debug!("signed request: {parts:?}");

    let resp = ctx
        .http_send(Request::from_parts(parts, Bytes::new()))
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_presigned_get_not_exist_object() -> Result<()> {
    let Some((ctx, config)) = init_live_test() else {
        warn!("AWSSIGN_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let cred = awssign_aws_v4::Credential {
        access_key_id: config.access_key_id.clone().unwrap_or_default(),
        secret_access_key: config.secret_access_key.clone().unwrap_or_default(),
        session_token: config.session_token.clone(),
    };

    let url = PresignedGet::new(config.s3_endpoint()?, config.region()?).presign(
        &ctx,
        &cred,
        "not_exist_file",
        None,
        Duration::from_secs(3600),
    )?;
    debug!("presigned url: {url}");

    let resp = ctx
        .http_send(Request::get(url).body(Bytes::new())?)
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}
