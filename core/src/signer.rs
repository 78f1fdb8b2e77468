use crate::{Context, Error, ProvideCredential, Result, SignRequest, SigningCredential};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Signer is the main struct used to sign the request.
///
/// The loaded credential is cached until it stops being valid.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<Mutex<Option<K>>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            loader: Arc::new(loader),
            builder: Arc::new(builder),
            credential: Arc::new(Mutex::new(None)),
        }
    }

    /// Return the context this signer uses.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Signing request.
    ///
    /// `None` signs with the Authorization header, `Some(expires_in)` presigns
    /// the URL.
    pub async fn sign(
        &self,
        req: &mut http::request::Parts,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let cached = self.cached()?;
        let credential = if cached.is_valid() {
            cached
        } else {
            let loaded = self.loader.provide_credential(&self.ctx).await?;
            *self
                .credential
                .lock()
                .map_err(|_| Error::unexpected("signer credential lock poisoned"))? =
                loaded.clone();
            loaded
        };

        self.builder
            .sign_request(&self.ctx, req, credential.as_ref(), expires_in)
            .await
    }

    fn cached(&self) -> Result<Option<K>> {
        Ok(self
            .credential
            .lock()
            .map_err(|_| Error::unexpected("signer credential lock poisoned"))?
            .clone())
    }
}
