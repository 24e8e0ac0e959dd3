use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use wallet_core::OneMany;
use wallet_vdc::pex::PresentationDefinition;

use crate::error::invalid;
use crate::types::RpRegistrationMetadata;

/// The intended audience of a Request Object: a single identifier or a set.
pub type Audience = OneMany<String>;

// Generates the wire-string table and conversions for a closed set of
// protocol values. Unknown strings are rejected rather than defaulted. Extra
// literals after `|` are accepted when parsing but never written.
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $name {
            /// The value's wire representation.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire $(| $alias)* => Ok(Self::$variant),)+
                    _ => Err(invalid!("unknown {}: {s}", stringify!($name))),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                value.parse().map_err(de::Error::custom)
            }
        }
    };
}

/// The type of response expected from the wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    /// A Self-Issued ID Token.
    IdToken,

    /// A VP Token.
    VpToken,

    /// A VP Token and a Self-Issued ID Token.
    VpTokenIdToken,

    /// An authorization code.
    Code,
}

wire_enum!(ResponseType {
    IdToken => "id_token",
    VpToken => "vp_token",
    VpTokenIdToken => "vp_token id_token" | "id_token vp_token",
    Code => "code",
});

/// How the Authorization Response is returned to the Verifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseMode {
    /// HTTPS POST to the Verifier's `response_uri`.
    DirectPost,

    /// As `DirectPost`, with the response wrapped in a JWT.
    DirectPostJwt,

    /// Parameters in the fragment of the `redirect_uri`.
    Fragment,

    /// Parameters in the query of the `redirect_uri`.
    Query,

    /// An auto-submitting HTML form to the `redirect_uri`.
    FormPost,
}

wire_enum!(ResponseMode {
    DirectPost => "direct_post",
    DirectPostJwt => "direct_post.jwt",
    Fragment => "fragment",
    Query => "query",
    FormPost => "form_post",
});

/// How the wallet should interpret and authenticate the `client_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientIdScheme {
    /// The `client_id` is the Verifier's redirect (or response) URI.
    RedirectUri,

    /// The `client_id` is a dNSName SAN of the request's leaf certificate.
    X509SanDns,

    /// The `client_id` is a URI SAN of the request's leaf certificate.
    X509SanUri,

    /// The `client_id` is a DID.
    Did,

    /// The `client_id` is an OpenID Federation Entity Identifier.
    EntityId,

    /// The `client_id` is known to the wallet in advance.
    PreRegistered,

    /// The `client_id` is the `sub` of a Verifier attestation JWT.
    VerifierAttestation,
}

wire_enum!(ClientIdScheme {
    RedirectUri => "redirect_uri",
    X509SanDns => "x509_san_dns",
    X509SanUri => "x509_san_uri",
    Did => "did",
    EntityId => "entity_id",
    PreRegistered => "pre-registered",
    VerifierAttestation => "verifier_attestation",
});

/// OAuth 2.0 level Authorization Request parameters, as received in the
/// request URI's query string.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizationRequestPayload {
    /// Requested scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Expected response type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,

    /// The Verifier's identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Where responses are redirected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Where `direct_post` responses are sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_uri: Option<String>,

    /// How the response is returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,

    /// Request Object JWT, by value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,

    /// Request Object JWT, by reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_uri: Option<String>,

    /// Verifier metadata, by value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_metadata: Option<RpRegistrationMetadata>,

    /// Verifier metadata, by reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_metadata_uri: Option<String>,

    /// Presentation Definition, by value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_definition: Option<PresentationDefinition>,

    /// Presentation Definition, by reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_definition_uri: Option<String>,

    /// How `client_id` is to be interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id_scheme: Option<ClientIdScheme>,

    /// Binds the response to this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Opaque Verifier state, echoed in the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Maximum authentication age, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
}

const OBJECT_PARAMS: [&str; 2] = ["client_metadata", "presentation_definition"];

impl AuthorizationRequestPayload {
    /// Build a payload from loosely-typed query parameters.
    ///
    /// Parameters are expected as decoded query strings. JSON text is parsed
    /// for object parameters and `max_age` is parsed as an integer; every
    /// other value is kept exactly as sent. Values already typed by the
    /// caller are accepted, with non-strings re-stringified for string
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` when an object parameter is not valid
    /// JSON or a parameter has an unknown or ill-typed value.
    pub fn from_query(params: &Map<String, Value>) -> Result<Self, crate::Error> {
        let mut normalized = Map::new();

        for (key, value) in params {
            let value = match (key.as_str(), value) {
                (_, Value::Null) => continue,
                (k, Value::String(s)) if OBJECT_PARAMS.contains(&k) => serde_json::from_str(s)
                    .map_err(|e| invalid!("{k} is not a JSON object: {e}"))?,
                (k, v) if OBJECT_PARAMS.contains(&k) => v.clone(),
                ("max_age", Value::String(s)) => {
                    let age = s.parse::<i64>().map_err(|e| invalid!("invalid max_age: {e}"))?;
                    Value::from(age)
                }
                ("max_age", v) => v.clone(),
                (_, Value::String(s)) => Value::String(s.clone()),
                (_, v) => Value::String(v.to_string()),
            };
            normalized.insert(key.clone(), value);
        }

        serde_json::from_value(Value::Object(normalized))
            .map_err(|e| invalid!("invalid authorization request: {e}"))
    }

    /// Merge `overrides` over `self`: every parameter present in `overrides`
    /// replaces the corresponding value in `self`.
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            scope: overrides.scope.or(self.scope),
            response_type: overrides.response_type.or(self.response_type),
            client_id: overrides.client_id.or(self.client_id),
            redirect_uri: overrides.redirect_uri.or(self.redirect_uri),
            response_uri: overrides.response_uri.or(self.response_uri),
            response_mode: overrides.response_mode.or(self.response_mode),
            request: overrides.request.or(self.request),
            request_uri: overrides.request_uri.or(self.request_uri),
            client_metadata: overrides.client_metadata.or(self.client_metadata),
            client_metadata_uri: overrides.client_metadata_uri.or(self.client_metadata_uri),
            presentation_definition: overrides
                .presentation_definition
                .or(self.presentation_definition),
            presentation_definition_uri: overrides
                .presentation_definition_uri
                .or(self.presentation_definition_uri),
            client_id_scheme: overrides.client_id_scheme.or(self.client_id_scheme),
            nonce: overrides.nonce.or(self.nonce),
            state: overrides.state.or(self.state),
            max_age: overrides.max_age.or(self.max_age),
        }
    }
}

/// The claims of a Request Object JWT: the Authorization Request parameters
/// plus the registered JWT claims.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequestObjectPayload {
    /// Authorization Request parameters carried in the Request Object.
    #[serde(flatten)]
    pub request: AuthorizationRequestPayload,

    /// Issuer of the Request Object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject of the Request Object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Intended audience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Issued-at time, seconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiry time, seconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}
