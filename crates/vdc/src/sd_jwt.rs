//! # IETF SD-JWT
//!
//! Decoding of compact SD-JWTs of the form
//! `<Issuer-signed JWT>~<Disclosure 1>~...~<Disclosure N>~<optional KB-JWT>`
//! and construction of key-bound presentations.
//!
//! See [I-D.ietf-oauth-selective-disclosure-jwt].
//!
//! [I-D.ietf-oauth-selective-disclosure-jwt]: https://datatracker.ietf.org/doc/draft-ietf-oauth-selective-disclosure-jwt

mod present;

use anyhow::{Context as _, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::serde::ts_seconds;
use chrono::{DateTime, Utc};
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use wallet_jose::{Header, Jwt, decode_header, decode_jwt};

pub use self::present::SdJwtVpBuilder;

/// A compact SD-JWT split into its components.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SdJwtParts {
    /// The Issuer-signed JWT.
    pub issuer_signed_jwt: String,

    /// Encoded disclosures, in presentation order.
    pub disclosures: Vec<String>,

    /// The Key Binding JWT, when present.
    pub key_binding_jwt: Option<String>,
}

/// Split a compact SD-JWT on `~`.
///
/// The first segment is the Issuer-signed JWT. The last segment is the Key
/// Binding JWT unless it is empty (a trailing `~`). Segments in between are
/// disclosures. A single segment after the Issuer-signed JWT with no
/// trailing `~` is therefore a KB-JWT, not a disclosure.
#[must_use]
pub fn divide_sd_jwt(sd_jwt: &str) -> SdJwtParts {
    let segments = sd_jwt.split('~').collect::<Vec<_>>();
    let issuer_signed_jwt = segments.first().copied().unwrap_or_default().to_string();

    if segments.len() < 2 {
        return SdJwtParts { issuer_signed_jwt, ..SdJwtParts::default() };
    }

    let last = segments.len() - 1;
    let key_binding_jwt = Some(segments[last]).filter(|s| !s.is_empty()).map(ToString::to_string);
    let disclosures = segments[1..last].iter().map(ToString::to_string).collect();

    SdJwtParts { issuer_signed_jwt, disclosures, key_binding_jwt }
}

/// A decoded disclosure.
///
/// Object-property disclosures (`[salt, key, value]`) carry both `key` and
/// `value`. Array-element disclosures (`[salt, value]`) have no key.
/// Malformed disclosures have neither.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disclosure {
    /// The base64url-encoded disclosure as it appears in the SD-JWT.
    pub disclosure: String,

    /// The claim name.
    pub key: Option<String>,

    /// The claim value.
    pub value: Option<Value>,
}

impl Disclosure {
    /// Create an object-property disclosure with a random salt.
    ///
    /// # Errors
    ///
    /// Returns an error if the disclosure cannot be serialized.
    pub fn new(key: impl Into<String>, value: Value) -> Result<Self> {
        let salt = Base64UrlUnpadded::encode_string(&rng().random::<[u8; 16]>());
        let key = key.into();
        let encoded = serde_json::to_vec(&json!([salt, key, value]))?;

        Ok(Self {
            disclosure: Base64UrlUnpadded::encode_string(&encoded),
            key: Some(key),
            value: Some(value),
        })
    }

    /// Decode a base64url-encoded disclosure. Never fails: an undecodable
    /// disclosure yields `None` for both key and value.
    #[must_use]
    pub fn decode(encoded: &str) -> Self {
        let unknown = Self { disclosure: encoded.to_string(), key: None, value: None };

        let parsed = Base64UrlUnpadded::decode_vec(encoded)
            .map_err(|e| e.to_string())
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).map_err(|e| e.to_string()));
        let array = match parsed {
            Ok(Value::Array(array)) => array,
            Ok(_) => return unknown,
            Err(e) => {
                tracing::warn!("cannot decode disclosure: {e}");
                return unknown;
            }
        };

        match array.as_slice() {
            [_salt, Value::String(key), value] => {
                Self { key: Some(key.clone()), value: Some(value.clone()), ..unknown }
            }
            [_salt, value] => Self { value: Some(value.clone()), ..unknown },
            _ => unknown,
        }
    }

    /// The digest of the disclosure as listed in an `_sd` array.
    #[must_use]
    pub fn digest(&self) -> String {
        sd_hash(&self.disclosure)
    }
}

/// Decode each of `disclosures`.
#[must_use]
pub fn decode_disclosures<S: AsRef<str>>(disclosures: &[S]) -> Vec<Disclosure> {
    disclosures.iter().map(|d| Disclosure::decode(d.as_ref())).collect()
}

/// An SD-JWT with its Issuer-signed JWT and disclosures decoded.
#[derive(Clone, Debug)]
pub struct DecodedSdJwt {
    /// The decoded (unverified) Issuer-signed JWT.
    pub jwt: Jwt,

    /// The decoded disclosures.
    pub disclosures: Vec<Disclosure>,

    /// The Key Binding JWT, when present.
    pub key_binding_jwt: Option<String>,
}

/// Split and decode a compact SD-JWT.
///
/// # Errors
///
/// Returns an error if the Issuer-signed JWT cannot be decoded.
pub fn decode_sd_jwt(sd_jwt: &str) -> Result<DecodedSdJwt> {
    let parts = divide_sd_jwt(sd_jwt);
    let jwt = decode_jwt(&parts.issuer_signed_jwt).context("decoding issuer-signed JWT")?;

    Ok(DecodedSdJwt {
        jwt,
        disclosures: decode_disclosures(&parts.disclosures),
        key_binding_jwt: parts.key_binding_jwt,
    })
}

/// The header of the Issuer-signed JWT, or `None` when it cannot be decoded.
#[must_use]
pub fn decoded_header(sd_jwt: &str) -> Option<Header> {
    decode_header(&divide_sd_jwt(sd_jwt).issuer_signed_jwt)
}

/// DER certificates from the Issuer-signed JWT's `x5c` header. Empty when the
/// header is absent or malformed.
#[must_use]
pub fn x509_certificates(sd_jwt: &str) -> Vec<Vec<u8>> {
    let Some(x5c) = decoded_header(sd_jwt).and_then(|h| h.x5c) else {
        return vec![];
    };
    wallet_jose::x509::x5c_certificates(&x5c).unwrap_or_else(|e| {
        tracing::warn!("ignoring malformed x5c: {e}");
        vec![]
    })
}

/// Claims of the Key Binding JWT.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct KbJwtClaims {
    /// The Verifier's Client Identifier.
    pub aud: String,

    /// The time of issuance of the Key Binding JWT.
    #[serde(with = "ts_seconds")]
    pub iat: DateTime<Utc>,

    /// The base64url-encoded hash over the Issuer-signed JWT and the selected
    /// disclosures.
    #[serde(rename = "_sd_hash")]
    pub sd_hash: String,

    /// The value of nonce from the Authorization Request.
    pub nonce: String,
}

/// JWT `typ` header values.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum JwtType {
    /// SD-JWT credential.
    #[serde(rename = "vc+sd-jwt")]
    #[default]
    SdJwt,

    /// Key Binding JWT.
    #[serde(rename = "kb+jwt")]
    KbJwt,
}

impl From<JwtType> for String {
    fn from(t: JwtType) -> Self {
        match t {
            JwtType::SdJwt => "vc+sd-jwt".to_string(),
            JwtType::KbJwt => "kb+jwt".to_string(),
        }
    }
}

/// Base64url-encoded SHA-256 of the ASCII bytes of `value`.
#[must_use]
pub fn sd_hash(value: &str) -> String {
    Base64UrlUnpadded::encode_string(Sha256::digest(value.as_bytes()).as_slice())
}
