//! # Request Resolution
//!
//! Parses a Self-Issued OP authorization request URI and resolves the
//! parameters a Verifier may pass by reference: the Request Object, client
//! metadata, and the Presentation Definition.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::instrument;
use wallet_core::http::HttpClient;
use wallet_core::urlencode::decode_query_strings;
use wallet_jose::decode_jwt;
use wallet_vdc::pex::PresentationDefinition;

use crate::error::invalid;
use crate::types::{AuthorizationRequestPayload, RequestObjectPayload, RpRegistrationMetadata};
use crate::{Error, Result};

static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*://").expect("scheme pattern should compile")
});

const BY_REFERENCE: &str = "REG_PASS_BY_REFERENCE_INCORRECTLY";

/// A parsed request with every by-reference parameter resolved.
#[derive(Clone, Debug)]
pub struct ParseAndResolveResult {
    /// URI scheme the request arrived on, e.g. `openid4vp`.
    pub scheme: String,

    /// Parameters from the request URI's query string.
    pub authorization_request_payload: AuthorizationRequestPayload,

    /// Claims of the Request Object, when one was sent.
    pub request_object: Option<RequestObjectPayload>,

    /// The Request Object JWT as received. Empty when none was sent.
    pub request_object_jwt: String,

    /// The Verifier's client metadata.
    pub registration_metadata: RpRegistrationMetadata,

    /// The Verifier's Presentation Definition, if it asked for credentials.
    pub presentation_definition: Option<PresentationDefinition>,

    /// Whether the Request Object carries a signature.
    pub request_is_signed: bool,
}

/// Split a request URI into its scheme and query parameters.
///
/// # Errors
///
/// Returns `Error::InvalidRequest` when the URI is blank, has no scheme, or
/// its parameters are malformed.
pub fn parse(uri: &str) -> Result<(String, AuthorizationRequestPayload)> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(invalid!("request URI is blank"));
    }
    let Some(matched) = SCHEME.find(uri) else {
        return Err(invalid!("request URI has no scheme"));
    };
    let scheme = matched.as_str().trim_end_matches("://").to_string();

    let query = uri.split_once('?').map_or("", |(_, q)| q);
    let query = query.split_once('#').map_or(query, |(q, _)| q);
    let payload = AuthorizationRequestPayload::from_query(&decode_query_strings(query))?;

    Ok((scheme, payload))
}

/// Resolve a parameter passed either by reference or by value. A non-blank
/// `reference` is fetched and takes precedence over `value`.
///
/// # Errors
///
/// Returns `Error::InvalidRequestUri` when the reference cannot be fetched or
/// parsed (`Error::TemporarilyUnavailable` when the failure is transient), and
/// `Error::InvalidRequest` when neither a reference nor a value is present.
pub async fn fetch_by_reference_or_use_by_value<T: DeserializeOwned>(
    reference: Option<&str>, value: Option<T>, http: &HttpClient,
) -> Result<T> {
    if let Some(uri) = reference.filter(|r| !r.trim().is_empty()) {
        tracing::debug!(uri, "resolving by reference");
        return http.get_json(uri).await.map_err(|e| by_reference(&e));
    }
    value.ok_or_else(|| invalid!("parameter is neither passed by reference nor by value"))
}

fn by_reference(err: &wallet_core::http::Error) -> Error {
    let message = format!("{BY_REFERENCE}: {err}");
    if err.is_retryable() {
        Error::TemporarilyUnavailable(message)
    } else {
        Error::InvalidRequestUri(message)
    }
}

/// Parse `uri` and resolve the Request Object, client metadata and
/// Presentation Definition.
///
/// Parameters in the Request Object take precedence over those in the URI:
/// when the Request Object carries either member of a by-value/by-reference
/// pair, the pair is taken from the Request Object.
///
/// # Errors
///
/// Returns an error when the URI is malformed, a reference cannot be
/// resolved, the Request Object cannot be decoded, or no client metadata is
/// present.
#[instrument(level = "debug", skip(http))]
pub async fn parse_and_resolve(uri: &str, http: &HttpClient) -> Result<ParseAndResolveResult> {
    let (scheme, payload) = parse(uri)?;

    let request_object_jwt = match (&payload.request_uri, &payload.request) {
        (Some(request_uri), _) if !request_uri.trim().is_empty() => {
            http.get_text(request_uri).await.map_err(|e| by_reference(&e))?
        }
        (_, Some(request)) => request.clone(),
        _ => String::new(),
    };

    let (request_object, request_is_signed) = if request_object_jwt.is_empty() {
        (None, false)
    } else {
        let jwt = decode_jwt::<RequestObjectPayload>(&request_object_jwt).map_err(|e| {
            Error::InvalidRequestObject(format!("cannot decode request object: {e}"))
        })?;
        let signed = !jwt.signature.is_empty() && jwt.header.alg != "none";
        (Some(jwt.claims), signed)
    };
    tracing::debug!(signed = request_is_signed, "request object: {}", request_object.is_some());

    let inner = request_object.as_ref().map(|ro| &ro.request);

    // client metadata is required
    let source = inner
        .filter(|r| r.client_metadata_uri.is_some() || r.client_metadata.is_some())
        .unwrap_or(&payload);
    let registration_metadata = fetch_by_reference_or_use_by_value(
        source.client_metadata_uri.as_deref(),
        source.client_metadata.clone(),
        http,
    )
    .await
    .map_err(|e| match e {
        Error::InvalidRequest(_) => invalid!("client metadata is missing"),
        other => other,
    })?;

    let source = inner
        .filter(|r| r.presentation_definition_uri.is_some() || r.presentation_definition.is_some())
        .unwrap_or(&payload);
    let presentation_definition =
        if source.presentation_definition_uri.is_some() || source.presentation_definition.is_some() {
            let definition = fetch_by_reference_or_use_by_value(
                source.presentation_definition_uri.as_deref(),
                source.presentation_definition.clone(),
                http,
            )
            .await?;
            Some(definition)
        } else {
            None
        };

    Ok(ParseAndResolveResult {
        scheme,
        authorization_request_payload: payload,
        request_object,
        request_object_jwt,
        registration_metadata,
        presentation_definition,
        request_is_signed,
    })
}
