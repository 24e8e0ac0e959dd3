//! # W3C Verifiable Credentials (JWT)
//!
//! Presentation of `jwt_vc_json` credentials: the credential JWT is wrapped
//! in a Verifiable Presentation which is itself secured as a JWT
//! (`jwt_vp_json`).

mod present;

use chrono::serde::ts_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use self::present::W3cVpBuilder;

/// Base context for W3C Verifiable Presentations.
pub const BASE_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Default type of a Verifiable Presentation.
pub const VP_TYPE: &str = "VerifiablePresentation";

/// A Verifiable Presentation carrying one or more credentials.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiablePresentation {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// Presentation type.
    #[serde(rename = "type")]
    pub type_: Vec<String>,

    /// Credentials, each a compact JWT.
    pub verifiable_credential: Vec<String>,
}

impl VerifiablePresentation {
    /// A presentation of a single credential.
    #[must_use]
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            context: vec![BASE_CONTEXT.to_string()],
            type_: vec![VP_TYPE.to_string()],
            verifiable_credential: vec![credential.into()],
        }
    }
}

/// Claims of a `jwt_vp_json` presentation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VpClaims {
    /// The holder, as a JWK Thumbprint URI.
    pub iss: String,

    /// The Verifier's client ID.
    pub aud: String,

    /// The nonce from the Authorization Request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Not valid before.
    #[serde(with = "ts_seconds")]
    pub nbf: DateTime<Utc>,

    /// Issued at.
    #[serde(with = "ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Expiry.
    #[serde(with = "ts_seconds")]
    pub exp: DateTime<Utc>,

    /// The presentation.
    pub vp: VerifiablePresentation,
}
