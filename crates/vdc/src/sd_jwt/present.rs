//! # SD-JWT Presentation

use anyhow::{Context as _, Result};
use chrono::Utc;
use wallet_jose::{Header, Signer, encode_jws};

use crate::sd_jwt::{Disclosure, JwtType, KbJwtClaims, sd_hash};

/// Build a key-bound SD-JWT presentation:
/// `<Issuer-signed JWT>~<Disclosure 1>~...~<Disclosure N>~<KB-JWT>`.
#[derive(Debug)]
pub struct SdJwtVpBuilder<M, C, S> {
    matched: M,
    client_id: C,
    nonce: Option<String>,
    signer: S,
}

/// Builder has no selected disclosures.
#[doc(hidden)]
pub struct NoMatched;
/// Builder has an Issuer-signed JWT and the disclosures to present.
#[doc(hidden)]
pub struct HasMatched<'a> {
    issuer_signed_jwt: &'a str,
    disclosures: &'a [Disclosure],
}

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

impl Default for SdJwtVpBuilder<NoMatched, NoClientId, NoSigner> {
    fn default() -> Self {
        Self::new()
    }
}

impl SdJwtVpBuilder<NoMatched, NoClientId, NoSigner> {
    /// Create a new builder.
    #[must_use]
    pub const fn new() -> Self {
        Self { matched: NoMatched, client_id: NoClientId, nonce: None, signer: NoSigner }
    }
}

// Credential and disclosures to include in the presentation
impl<C, S> SdJwtVpBuilder<NoMatched, C, S> {
    /// Set the Issuer-signed JWT and the disclosures selected for the
    /// Verifier, in presentation order.
    #[must_use]
    pub fn matched<'a>(
        self, issuer_signed_jwt: &'a str, disclosures: &'a [Disclosure],
    ) -> SdJwtVpBuilder<HasMatched<'a>, C, S> {
        SdJwtVpBuilder {
            matched: HasMatched { issuer_signed_jwt, disclosures },
            client_id: self.client_id,
            nonce: self.nonce,
            signer: self.signer,
        }
    }
}

// Verifier the presentation is for
impl<M, S> SdJwtVpBuilder<M, NoClientId, S> {
    /// Set the Verifier's client ID, used as the KB-JWT audience.
    #[must_use]
    pub fn client_id(self, client_id: impl Into<String>) -> SdJwtVpBuilder<M, HasClientId, S> {
        SdJwtVpBuilder {
            matched: self.matched,
            client_id: HasClientId(client_id.into()),
            nonce: self.nonce,
            signer: self.signer,
        }
    }
}

// Optional fields
impl<M, C, S> SdJwtVpBuilder<M, C, S> {
    /// Set the nonce from the Authorization Request.
    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

// Signer
impl<M, C> SdJwtVpBuilder<M, C, NoSigner> {
    /// Set the holder's key-binding `Signer`.
    #[must_use]
    pub fn signer<S: Signer>(self, signer: &'_ S) -> SdJwtVpBuilder<M, C, HasSigner<'_, S>> {
        SdJwtVpBuilder {
            matched: self.matched,
            client_id: self.client_id,
            nonce: self.nonce,
            signer: HasSigner(signer),
        }
    }
}

impl<S: Signer> SdJwtVpBuilder<HasMatched<'_>, HasClientId, HasSigner<'_, S>> {
    /// Build the presentation.
    ///
    /// The KB-JWT `_sd_hash` is computed over the exact characters preceding
    /// the KB-JWT in the returned presentation.
    ///
    /// # Errors
    ///
    /// Returns an error if the KB-JWT cannot be signed.
    pub async fn build(self) -> Result<String> {
        let HasMatched { issuer_signed_jwt, disclosures } = self.matched;

        let mut sd = format!("{issuer_signed_jwt}~");
        for disclosure in disclosures {
            sd.push_str(&disclosure.disclosure);
            sd.push('~');
        }

        let claims = KbJwtClaims {
            aud: self.client_id.0,
            iat: Utc::now(),
            sd_hash: sd_hash(&sd),
            nonce: self.nonce.unwrap_or_default(),
        };
        let header = Header::new(self.signer.0.algorithm()).typ(JwtType::KbJwt);
        let kb_jwt = encode_jws(&header, &claims, self.signer.0).await.context("signing KB-JWT")?;

        Ok(format!("{sd}{kb_jwt}"))
    }
}
