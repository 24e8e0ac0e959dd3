use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wallet_jose::Jwks;
use wallet_vdc::pex::ClaimFormat;

/// The Verifier's (Relying Party's) client metadata, sent by value in
/// `client_metadata` or by reference in `client_metadata_uri`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RpRegistrationMetadata {
    /// Name of the Verifier, for display to the holder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    /// Verifier logo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,

    /// Where the Verifier describes how it uses the data presented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_uri: Option<String>,

    /// The Verifier's terms of service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tos_uri: Option<String>,

    /// Why the Verifier is asking for the holder's data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_purpose: Option<String>,

    /// The Verifier's public keys, by value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<Jwks>,

    /// The Verifier's public keys, by reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// Credential and presentation formats the Verifier supports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vp_formats: Option<HashMap<String, ClaimFormat>>,

    /// Subject identifier types the Verifier accepts in ID Tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_syntax_types_supported: Option<Vec<String>>,

    /// Metadata parameters not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
