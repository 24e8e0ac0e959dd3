//! # Process Authorization Request
//!
//! Resolves the request URI and establishes that the Verifier is who its
//! `client_id` claims to be.
//!
//! A signed Request Object is only accepted with the `x509_san_dns` client
//! identifier scheme: the signature must verify against the leaf of the
//! `x5c`/`x5u` certificate chain, the chain must be trusted, and the
//! `client_id` must be both a dNSName SAN of the leaf and the host of the
//! response URI.
//!
//! An unsigned request using the `redirect_uri` scheme must have a `client_id`
//! equal to its response URI. Unsigned requests using other schemes are
//! accepted as-is.

use serde_json::Value;
use tracing::instrument;
use wallet_jose::x509::san_dns_names;
use wallet_jose::{Signer, verify_jwt_with_x509};

use crate::error::{client, invalid};
use crate::provider::{OpenIdProvider, Pending, ProcessSiopRequestResult, Processed};
use crate::resolve::parse_and_resolve;
use crate::types::{AuthorizationRequestPayload, ClientIdScheme};
use crate::{Error, Result};

impl<'a, S: Signer> OpenIdProvider<'a, S, Pending> {
    /// Resolve and verify the Authorization Request.
    ///
    /// # Errors
    ///
    /// Returns an error when the request is malformed, a by-reference
    /// parameter cannot be resolved, the Request Object does not verify, or
    /// the Verifier's `client_id` cannot be established.
    #[instrument(level = "debug", skip(self), fields(uri = %self.state.uri))]
    pub async fn process_authorization_request(self) -> Result<OpenIdProvider<'a, S, Processed>> {
        let resolved = parse_and_resolve(&self.state.uri, &self.http).await?;
        let request_is_signed = resolved.request_is_signed;
        let result = ProcessSiopRequestResult::from(resolved);

        let request = &result.request;
        let Some(client_id) = request.client_id.as_deref().filter(|id| !id.is_empty()) else {
            return Err(invalid!("client_id is missing"));
        };

        if request_is_signed {
            tracing::debug!(scheme = ?request.client_id_scheme, "signed request");
            match request.client_id_scheme {
                Some(ClientIdScheme::X509SanDns) => {
                    self.verify_x509_san_dns(&result.request_object_jwt, client_id, request).await?;
                }
                _ => return Err(client!("Unsupported serialization of Authorization Request Error")),
            }
        } else if request.client_id_scheme == Some(ClientIdScheme::RedirectUri) {
            tracing::debug!("unsigned request, redirect_uri scheme");
            if response_uri(request) != Some(client_id) {
                return Err(client!("Invalid client_id or response_uri"));
            }
        }

        Ok(OpenIdProvider {
            signer: self.signer,
            http: self.http,
            option: self.option,
            state: Processed { result },
        })
    }

    async fn verify_x509_san_dns(
        &self, jwt: &str, client_id: &str, request: &AuthorizationRequestPayload,
    ) -> Result<()> {
        let (_, chain) = verify_jwt_with_x509::<Value>(jwt, &self.http, &self.option.trust)
            .await
            .map_err(|e| match e {
                wallet_jose::Error::Fetch(fetch) => Error::from(fetch),
                other => Error::InvalidRequestObject(format!("request object: {other}")),
            })?;

        let leaf = chain.first().ok_or_else(|| {
            Error::InvalidRequestObject("request object has no certificate".to_string())
        })?;
        let names = san_dns_names(leaf)
            .map_err(|e| Error::InvalidRequestObject(format!("leaf certificate: {e}")))?;
        if !names.iter().any(|name| name == client_id) {
            return Err(client!("client_id {client_id} is not a SAN of the request certificate"));
        }

        let Some(uri) = response_uri(request) else {
            return Err(invalid!("response_uri is missing"));
        };
        let uri = uri.parse::<http::Uri>().map_err(|e| invalid!("invalid response_uri: {e}"))?;
        if uri.host() != Some(client_id) {
            return Err(client!("client_id {client_id} does not match the response_uri host"));
        }

        Ok(())
    }
}

// `response_uri`, falling back to `redirect_uri`.
fn response_uri(request: &AuthorizationRequestPayload) -> Option<&str> {
    request.response_uri.as_deref().or(request.redirect_uri.as_deref())
}
