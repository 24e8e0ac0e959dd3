//! # W3C-VC Presentation

use anyhow::{Context as _, Result};
use chrono::{Duration, Utc};
use wallet_jose::{Header, Signer, encode_jws};

use crate::w3c_vc::{VerifiablePresentation, VpClaims};

/// Default validity of a presentation.
const DEFAULT_VALIDITY: Duration = Duration::hours(2);

/// Wrap a `jwt_vc_json` credential in a signed `jwt_vp_json` presentation.
#[derive(Debug)]
pub struct W3cVpBuilder<M, C, S> {
    credential: M,
    client_id: C,
    nonce: Option<String>,
    expires_in: Duration,
    signer: S,
}

/// Builder has no credential.
#[doc(hidden)]
pub struct NoCredential;
/// Builder has a credential.
#[doc(hidden)]
pub struct HasCredential(String);

/// Builder has no client ID.
#[doc(hidden)]
pub struct NoClientId;
/// Builder has a client ID.
#[doc(hidden)]
pub struct HasClientId(String);

/// Builder has no signer.
#[doc(hidden)]
pub struct NoSigner;
/// Builder state has a signer.
#[doc(hidden)]
pub struct HasSigner<'a, S: Signer>(pub &'a S);

impl Default for W3cVpBuilder<NoCredential, NoClientId, NoSigner> {
    fn default() -> Self {
        Self::new()
    }
}

impl W3cVpBuilder<NoCredential, NoClientId, NoSigner> {
    /// Create a new builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            credential: NoCredential,
            client_id: NoClientId,
            nonce: None,
            expires_in: DEFAULT_VALIDITY,
            signer: NoSigner,
        }
    }
}

// Credential to include in the presentation
impl<C, S> W3cVpBuilder<NoCredential, C, S> {
    /// Set the credential JWT.
    #[must_use]
    pub fn credential(self, credential: impl Into<String>) -> W3cVpBuilder<HasCredential, C, S> {
        W3cVpBuilder {
            credential: HasCredential(credential.into()),
            client_id: self.client_id,
            nonce: self.nonce,
            expires_in: self.expires_in,
            signer: self.signer,
        }
    }
}

impl<M, S> W3cVpBuilder<M, NoClientId, S> {
    /// Set the Verifier's client ID, used as the presentation audience.
    #[must_use]
    pub fn client_id(self, client_id: impl Into<String>) -> W3cVpBuilder<M, HasClientId, S> {
        W3cVpBuilder {
            credential: self.credential,
            client_id: HasClientId(client_id.into()),
            nonce: self.nonce,
            expires_in: self.expires_in,
            signer: self.signer,
        }
    }
}

// Optional fields
impl<M, C, S> W3cVpBuilder<M, C, S> {
    /// Set the nonce from the Authorization Request.
    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Override the default two-hour validity window.
    #[must_use]
    pub const fn expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }
}

impl<M, C> W3cVpBuilder<M, C, NoSigner> {
    /// Set the holder's `Signer`.
    #[must_use]
    pub fn signer<S: Signer>(self, signer: &'_ S) -> W3cVpBuilder<M, C, HasSigner<'_, S>> {
        W3cVpBuilder {
            credential: self.credential,
            client_id: self.client_id,
            nonce: self.nonce,
            expires_in: self.expires_in,
            signer: HasSigner(signer),
        }
    }
}

impl<S: Signer> W3cVpBuilder<HasCredential, HasClientId, HasSigner<'_, S>> {
    /// Build the presentation, returning a compact JWT whose `vp` claim
    /// carries the credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the holder's key cannot be resolved or signing
    /// fails.
    pub async fn build(self) -> Result<String> {
        let signer = self.signer.0;
        let jwk = signer.public_jwk().await.context("resolving holder key")?;

        let now = Utc::now();
        let exp = now.checked_add_signed(self.expires_in).context("VP expiry is out of range")?;
        let claims = VpClaims {
            iss: jwk.thumbprint_uri()?,
            aud: self.client_id.0,
            nonce: self.nonce,
            nbf: now,
            iat: now,
            exp,
            vp: VerifiablePresentation::new(self.credential.0),
        };

        let mut header = Header::new(signer.algorithm()).typ("JWT");
        header.jwk = Some(jwk);
        encode_jws(&header, &claims, signer).await.context("signing VP JWT")
    }
}
