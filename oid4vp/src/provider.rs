//! # Self-Issued OpenID Provider
//!
//! The wallet's side of one SIOPv2 / `OpenID4VP` exchange. An
//! [`OpenIdProvider`] is created for a single request URI and moves through
//! two states:
//!
//! * [`Pending`]: holds the raw request URI until
//!   [`OpenIdProvider::process_authorization_request`] resolves and verifies it.
//! * [`Processed`]: holds the verified request until the holder responds with
//!   either an ID Token or a VP Token. Responding consumes the provider, so at
//!   most one response is sent per exchange.

use wallet_core::http::HttpClient;
use wallet_jose::Signer;
use wallet_vdc::pex::PresentationDefinition;

use crate::config::ProviderOption;
use crate::resolve::ParseAndResolveResult;
use crate::types::{AuthorizationRequestPayload, RequestObjectPayload, RpRegistrationMetadata};
use crate::Result;

/// The resolved and verified request, carried from processing to responding.
#[derive(Clone, Debug)]
pub struct ProcessSiopRequestResult {
    /// URI scheme the request arrived on.
    pub scheme: String,

    /// Claims of the Request Object, when one was sent.
    pub request_object: Option<RequestObjectPayload>,

    /// Parameters from the request URI's query string.
    pub authorization_request_payload: AuthorizationRequestPayload,

    /// The Request Object JWT as received. Empty when none was sent.
    pub request_object_jwt: String,

    /// The Verifier's client metadata.
    pub registration_metadata: RpRegistrationMetadata,

    /// The Verifier's Presentation Definition, if it asked for credentials.
    pub presentation_definition: Option<PresentationDefinition>,

    /// The effective request: the query parameters with the Request Object's
    /// parameters merged over them.
    pub request: AuthorizationRequestPayload,
}

impl From<ParseAndResolveResult> for ProcessSiopRequestResult {
    fn from(resolved: ParseAndResolveResult) -> Self {
        let request = match &resolved.request_object {
            Some(object) => {
                resolved.authorization_request_payload.clone().merge(object.request.clone())
            }
            None => resolved.authorization_request_payload.clone(),
        };

        Self {
            scheme: resolved.scheme,
            request_object: resolved.request_object,
            authorization_request_payload: resolved.authorization_request_payload,
            request_object_jwt: resolved.request_object_jwt,
            registration_metadata: resolved.registration_metadata,
            presentation_definition: resolved.presentation_definition,
            request,
        }
    }
}

/// One authorization exchange, parameterised by its state.
#[derive(Debug)]
pub struct OpenIdProvider<'a, S: Signer, St> {
    pub(crate) signer: &'a S,
    pub(crate) http: HttpClient,
    pub(crate) option: ProviderOption,
    pub(crate) state: St,
}

/// The request has been received but not yet processed.
#[derive(Clone, Debug)]
pub struct Pending {
    pub(crate) uri: String,
}

/// The request has been resolved and verified.
#[derive(Clone, Debug)]
pub struct Processed {
    pub(crate) result: ProcessSiopRequestResult,
}

impl<'a, S: Signer> OpenIdProvider<'a, S, Pending> {
    /// Create a provider for the request at `uri`, signing with `signer`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ServerError` if the HTTP client cannot be built.
    pub fn new(uri: impl Into<String>, signer: &'a S, option: ProviderOption) -> Result<Self> {
        let http = HttpClient::new(option.timeout())?;
        Ok(Self { signer, http, option, state: Pending { uri: uri.into() } })
    }
}

impl<S: Signer> OpenIdProvider<'_, S, Processed> {
    /// The verified request.
    #[must_use]
    pub const fn result(&self) -> &ProcessSiopRequestResult {
        &self.state.result
    }

    /// The effective request's `client_id`.
    pub(crate) fn client_id(&self) -> Result<&str> {
        self.state
            .result
            .request
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| crate::error::invalid!("client_id is missing"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseMode;

    #[test]
    fn request_object_wins() {
        let resolved = ParseAndResolveResult {
            scheme: "openid4vp".to_string(),
            authorization_request_payload: AuthorizationRequestPayload {
                client_id: Some("outer".to_string()),
                state: Some("s-1".to_string()),
                ..AuthorizationRequestPayload::default()
            },
            request_object: Some(RequestObjectPayload {
                request: AuthorizationRequestPayload {
                    client_id: Some("inner".to_string()),
                    response_mode: Some(ResponseMode::DirectPost),
                    ..AuthorizationRequestPayload::default()
                },
                ..RequestObjectPayload::default()
            }),
            request_object_jwt: "h.p.s".to_string(),
            registration_metadata: RpRegistrationMetadata::default(),
            presentation_definition: None,
            request_is_signed: true,
        };

        let result = ProcessSiopRequestResult::from(resolved);
        assert_eq!(result.request.client_id.as_deref(), Some("inner"));
        assert_eq!(result.request.state.as_deref(), Some("s-1"));
        assert_eq!(result.request.response_mode, Some(ResponseMode::DirectPost));
        assert_eq!(result.authorization_request_payload.client_id.as_deref(), Some("outer"));
    }
}
