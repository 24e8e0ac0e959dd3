use chrono::serde::ts_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use wallet_jose::Jwk;
use wallet_vdc::pex::{InputDescriptor, PresentationSubmission};

/// Claims of a Self-Issued ID Token. The token is self-issued, so `iss` and
/// `sub` are both the thumbprint URI of the holder's key.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IdTokenClaims {
    /// Issuer: the holder's JWK thumbprint URI.
    pub iss: String,

    /// Subject: the holder's JWK thumbprint URI.
    pub sub: String,

    /// Audience: the Verifier's `client_id`.
    pub aud: String,

    /// Issued-at time.
    #[serde(with = "ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Expiry time.
    #[serde(with = "ts_seconds")]
    pub exp: DateTime<Utc>,

    /// The request's nonce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// The holder's public key.
    pub sub_jwk: Jwk,
}

/// A credential the holder chose to satisfy one Input Descriptor.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubmissionCredential {
    /// Wallet-local identifier of the credential.
    pub id: String,

    /// Credential format, e.g. `vc+sd-jwt` or `jwt_vc_json`.
    pub format: String,

    /// Credential types, for display.
    #[serde(default)]
    pub types: Vec<String>,

    /// The credential in its compact serialization.
    pub credential: String,

    /// The Input Descriptor the credential is submitted for, matched by `id`
    /// against the request's Presentation Definition. An SD-JWT with an
    /// empty `id` answers the first descriptor it satisfies.
    pub input_descriptor: InputDescriptor,
}

/// A VP Token response, posted to the Verifier as form fields.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct VpTokenResponse {
    /// One presentation per submitted credential.
    #[serde(serialize_with = "vp_token")]
    pub vp_token: Vec<String>,

    /// Where each presentation sits in `vp_token`.
    pub presentation_submission: PresentationSubmission,

    /// The request's `state`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

// Empty string for no presentations, the presentation itself for one, and an
// array otherwise.
fn vp_token<S: Serializer>(tokens: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    match tokens {
        [] => serializer.serialize_str(""),
        [token] => serializer.serialize_str(token),
        many => many.serialize(serializer),
    }
}

/// A Self-Issued ID Token response, posted to the Verifier as form fields.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct IdTokenResponse {
    pub id_token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// The outcome of posting an Authorization Response.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PostResult {
    /// HTTP status returned by the Verifier.
    pub status_code: u16,

    /// Where the holder should be sent next: the `Location` header of a
    /// redirect, or a `redirect_uri` returned in a JSON body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Cookies set by the Verifier.
    #[serde(default)]
    pub cookies: Vec<String>,

    /// Raw response body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
}

/// What was shared with the Verifier for one submitted credential, for the
/// host's presentation history.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SharedCredential {
    /// Wallet-local identifier of the credential.
    pub id: String,

    /// Credential format.
    pub format: String,

    /// Claims disclosed to the Verifier. For SD-JWTs, the selected
    /// disclosures. For JWT VCs, the whole credential subject.
    pub shared_claims: Map<String, Value>,
}
