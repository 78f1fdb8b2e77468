use crate::canonical::{CanonicalRequest, Payload};
use crate::constants::{
    ALGORITHM, MAX_PRESIGN_EXPIRES_SECS, X_AMZ_ALGORITHM_QUERY, X_AMZ_CONTENT_SHA_256,
    X_AMZ_CREDENTIAL_QUERY, X_AMZ_DATE, X_AMZ_DATE_QUERY, X_AMZ_EXPIRES_QUERY,
    X_AMZ_SECURITY_TOKEN, X_AMZ_SECURITY_TOKEN_QUERY, X_AMZ_SIGNATURE_QUERY,
    X_AMZ_SIGNED_HEADERS_QUERY,
};
use crate::signing_key::{scope, string_to_sign, SigningKey};
use crate::Credential;
use async_trait::async_trait;
use awssign_core::time::{format_iso8601, DateTime};
use awssign_core::{Context, Error, Result, SignRequest, SigningMethod, SigningRequest};
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use std::time::Duration;

/// RequestSigner that implement AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
    region: String,
}

impl RequestSigner {
    /// Create a new builder for AWS V4 signer.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),
        }
    }

    /// Service this signer signs for, like `s3`.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Region this signer signs for.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sign the request in place at the given time.
    ///
    /// - [`SigningMethod::Header`] adds `host`, `x-amz-date`, `x-amz-content-sha256`
    ///   (the hash of `payload`) and the session token header, then writes
    ///   `Authorization`.
    /// - [`SigningMethod::Query`] adds the `X-Amz-*` query parameters and signs an
    ///   unsigned payload; `payload` is ignored.
    ///
    /// Credentials, expiry and authority are checked before any hashing happens.
    pub fn sign(
        &self,
        parts: &mut Parts,
        cred: &Credential,
        method: SigningMethod,
        payload: Payload<'_>,
        now: DateTime,
    ) -> Result<()> {
        cred.check()?;
        if let SigningMethod::Query(expires) = method {
            check_expires(expires)?;
        }
        if parts.uri.authority().is_none() {
            return Err(Error::request_invalid(
                "request without authority is invalid for signing",
            ));
        }

        let mut req = SigningRequest::build(parts)?;
        strip_signature(&mut req);

        let scope = scope(now, &self.region, &self.service);
        debug!("calculated scope: {scope}");

        // Insert HOST header if not present.
        if req.headers.get(header::HOST).is_none() {
            let host = HeaderValue::from_str(req.authority.as_str())?;
            req.headers.insert(header::HOST, host);
        }

        let payload = match method {
            SigningMethod::Header => {
                canonicalize_header(&mut req, cred, &payload, now)?;
                payload
            }
            SigningMethod::Query(expires) => {
                canonicalize_query(&mut req, cred, expires, now, &scope);
                Payload::Unsigned
            }
        };

        let creq = {
            let path = req.path_percent_decoded().into_owned();
            let mut headers = Vec::with_capacity(req.headers.len());
            for (k, v) in req.headers.iter() {
                headers.push((k.as_str(), v.to_str()?));
            }
            CanonicalRequest::new(
                req.method.as_str(),
                &path,
                req.query.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                headers,
                payload,
            )
        };

        let string_to_sign = string_to_sign(now, &scope, &creq.hash());
        debug!("calculated string to sign: {string_to_sign}");

        let signature =
            SigningKey::derive(&cred.secret_access_key, now, &self.region, &self.service)
                .sign(&string_to_sign);

        // Write back the encoded query so the URL matches what was signed.
        req.query = creq.query().to_vec();

        match method {
            SigningMethod::Query(_) => req.query_push(X_AMZ_SIGNATURE_QUERY, signature),
            SigningMethod::Header => {
                let mut authorization = HeaderValue::from_str(&format!(
                    "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={}",
                    cred.access_key_id,
                    scope,
                    creq.signed_headers(),
                    signature
                ))?;
                authorization.set_sensitive(true);

                req.headers.insert(header::AUTHORIZATION, authorization);
            }
        }

        // Apply to the request.
        req.apply(parts)
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        if let Some(expires) = expires_in {
            check_expires(expires)?;
        }
        let Some(cred) = credential else {
            return Err(Error::credential_invalid("no credential loaded"));
        };

        let payload = match req.headers.get(X_AMZ_CONTENT_SHA_256) {
            Some(v) => Payload::Hashed(v.to_str()?.to_string()),
            None => Payload::Unsigned,
        };

        self.sign(req, cred, expires_in.into(), payload, ctx.now())
    }
}

fn check_expires(expires: Duration) -> Result<()> {
    let secs = expires.as_secs();
    if secs == 0 || secs > MAX_PRESIGN_EXPIRES_SECS {
        return Err(Error::request_invalid(format!(
            "presign expiry must be between 1 and {MAX_PRESIGN_EXPIRES_SECS} seconds, got {expires:?}"
        )));
    }
    Ok(())
}

/// Drop whatever a previous signing pass left behind so signing is idempotent.
fn strip_signature(req: &mut SigningRequest) {
    req.headers.remove(header::AUTHORIZATION);
    req.headers.remove(X_AMZ_SECURITY_TOKEN);
    req.query.retain(|(k, _)| {
        ![
            X_AMZ_ALGORITHM_QUERY,
            X_AMZ_CREDENTIAL_QUERY,
            X_AMZ_DATE_QUERY,
            X_AMZ_EXPIRES_QUERY,
            X_AMZ_SIGNED_HEADERS_QUERY,
            X_AMZ_SECURITY_TOKEN_QUERY,
            X_AMZ_SIGNATURE_QUERY,
        ]
        .contains(&k.as_str())
    });
}

fn canonicalize_header(
    req: &mut SigningRequest,
    cred: &Credential,
    payload: &Payload<'_>,
    now: DateTime,
) -> Result<()> {
    req.headers
        .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);
    req.headers.insert(
        X_AMZ_CONTENT_SHA_256,
        HeaderValue::try_from(payload.hash())?,
    );

    // Insert X_AMZ_SECURITY_TOKEN header if security token exists.
    if let Some(token) = &cred.session_token {
        let mut value = HeaderValue::from_str(token)?;
        // Set token value sensitive to valid leaking.
        value.set_sensitive(true);

        req.headers.insert(X_AMZ_SECURITY_TOKEN, value);
    }

    Ok(())
}

fn canonicalize_query(
    req: &mut SigningRequest,
    cred: &Credential,
    expires: Duration,
    now: DateTime,
    scope: &str,
) {
    let signed_headers = req.header_name_to_vec_sorted().join(";");

    req.query_push(X_AMZ_ALGORITHM_QUERY, ALGORITHM);
    req.query_push(
        X_AMZ_CREDENTIAL_QUERY,
        format!("{}/{}", cred.access_key_id, scope),
    );
    req.query_push(X_AMZ_DATE_QUERY, format_iso8601(now));
    req.query_push(X_AMZ_EXPIRES_QUERY, expires.as_secs().to_string());
    req.query_push(X_AMZ_SIGNED_HEADERS_QUERY, signed_headers);

    if let Some(token) = &cred.session_token {
        req.query_push(X_AMZ_SECURITY_TOKEN_QUERY, token.as_str());
    }
}
