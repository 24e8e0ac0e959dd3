//! # ID Token Response
//!
//! Responds to a SIOPv2 request with a Self-Issued ID Token. The token's `iss`
//! and `sub` are the JWK thumbprint URI of the holder's key, which is also
//! carried in `sub_jwk`.

use chrono::Utc;
use tracing::instrument;
use wallet_core::urlencode::form_encode;
use wallet_jose::{Header, Signer, encode_jws};

use crate::provider::{OpenIdProvider, Processed};
use crate::types::{IdTokenClaims, IdTokenResponse, PostResult};
use crate::{Error, Result};

impl<S: Signer> OpenIdProvider<'_, S, Processed> {
    /// Sign a Self-Issued ID Token and post it to the Verifier with the
    /// request's `state`.
    ///
    /// # Errors
    ///
    /// Returns an error when the token cannot be signed, the request has no
    /// response destination, or the Verifier rejects the response.
    #[instrument(level = "debug", skip(self))]
    pub async fn respond_id_token_response(self) -> Result<PostResult> {
        let id_token = self.id_token().await?;

        let response =
            IdTokenResponse { id_token, state: self.state.result.request.state.clone() };
        let form = form_encode(&response)?;

        self.post(self.destination()?, &form).await
    }

    async fn id_token(&self) -> Result<String> {
        let client_id = self.client_id()?;
        let jwk = self
            .signer
            .public_jwk()
            .await
            .map_err(|e| Error::ServerError(format!("cannot get holder key: {e}")))?;
        let subject = jwk
            .thumbprint_uri()
            .map_err(|e| Error::ServerError(format!("cannot compute thumbprint: {e}")))?;

        let now = Utc::now();
        let exp = now
            .checked_add_signed(self.option.id_token_expiry()?)
            .ok_or_else(|| Error::ServerError("ID token expiry is out of range".to_string()))?;
        let claims = IdTokenClaims {
            iss: subject.clone(),
            sub: subject,
            aud: client_id.to_string(),
            iat: now,
            exp,
            nonce: self.state.result.request.nonce.clone(),
            sub_jwk: jwk,
        };

        let header = Header::new(self.signer.algorithm()).typ("JWT");
        encode_jws(&header, &claims, self.signer)
            .await
            .map_err(|e| Error::ServerError(format!("cannot sign ID token: {e}")))
    }
}
