//! AWS SigV4 signing for awssign.
//!
//! This crate signs requests for S3, SES, SNS and other AWS services with
//! [Signature Version 4](https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_sigv.html),
//! builds presigned GET URLs and browser upload (POST) policies.
//!
//! ## Quick Start
//!
//! ```no_run
//! use awssign_aws_v4::{EnvCredentialProvider, RequestSigner};
//! use awssign_core::{Context, OsEnv, Signer};
//!
//! # async fn example() -> awssign_core::Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let signer = Signer::new(
//!     ctx,
//!     EnvCredentialProvider::new(),
//!     RequestSigner::new("s3", "us-east-1"),
//! );
//!
//! let mut parts = http::Request::get("https://examplebucket.s3.us-east-1.amazonaws.com/test.txt")
//!     .body(())
//!     .map_err(awssign_core::Error::from)?
//!     .into_parts()
//!     .0;
//! signer.sign(&mut parts, None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Presigned URLs and POST policies
//!
//! ```no_run
//! use std::time::Duration;
//! use awssign_aws_v4::{Credential, Endpoint, PostPolicy, PresignedGet, Upload};
//! use awssign_core::Context;
//!
//! # fn example() -> awssign_core::Result<()> {
//! let ctx = Context::new();
//! let cred = Credential::new("access_key_id", "secret_access_key");
//!
//! let url = PresignedGet::new(Endpoint::s3("examplebucket", "us-east-1"), "us-east-1")
//!     .presign(&ctx, &cred, "photos/cat.jpg", None, Duration::from_secs(3600))?;
//!
//! let form = PostPolicy::new("examplebucket", "us-east-1").presign(
//!     &ctx,
//!     &cred,
//!     &Upload::new("photos/", "cat.jpg", "image/jpeg", 1024),
//! )?;
//! # Ok(())
//! # }
//! ```

mod constants;
pub use constants::MAX_PRESIGN_EXPIRES_SECS;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::*;

mod canonical;
pub use canonical::{CanonicalRequest, Payload};

mod signing_key;
pub use signing_key::SigningKey;

mod sign_request;
pub use sign_request::RequestSigner;

mod endpoint;
pub use endpoint::Endpoint;

mod presign;
pub use presign::PresignedGet;

mod post_policy;
pub use post_policy::{PostPolicy, PostPolicyForm, Upload};

pub use awssign_core::SigningMethod;
