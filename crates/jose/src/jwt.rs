//! # JSON Web Token
//!
//! Compact JWS encoding and decoding.

use std::future::Future;

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::signature::der_to_raw;
use crate::{Algorithm, Error, Jwk, Result};

/// JOSE header of a compact JWS.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Header {
    /// Signing algorithm, kept as the wire string so that unsupported
    /// algorithms can still be decoded for display.
    pub alg: String,

    /// Media type of the complete JWT, e.g. `kb+jwt`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Certificate chain, leaf first. Each entry is base64 DER (or PEM).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,

    /// URL of a PEM certificate bundle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5u: Option<String>,

    /// Embedded public key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<Jwk>,

    /// Any other header parameters.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Header {
    /// Create a header for `alg`.
    #[must_use]
    pub fn new(alg: Algorithm) -> Self {
        Self { alg: alg.to_string(), ..Self::default() }
    }

    /// Set the `typ` parameter.
    #[must_use]
    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = Some(typ.into());
        self
    }

    /// The header's algorithm.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAlgorithm` when `alg` is not one of the supported
    /// algorithms.
    pub fn algorithm(&self) -> Result<Algorithm> {
        self.alg.parse()
    }
}

/// A decoded JWT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Jwt<T = Map<String, Value>> {
    /// JOSE header.
    pub header: Header,

    /// Claims set.
    pub claims: T,

    /// Signature bytes. Empty for an unsigned JWT.
    pub signature: Vec<u8>,
}

/// Split a compact JWT into its header, payload and signature segments.
pub(crate) fn segments(jwt: &str) -> Result<[&str; 3]> {
    let parts = jwt.split('.').collect::<Vec<_>>();
    let [header, payload, signature] = parts[..] else {
        return Err(Error::Format(format!("expected 3 parts, found {}", parts.len())));
    };
    Ok([header, payload, signature])
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T> {
    let bytes = Base64UrlUnpadded::decode_vec(segment)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode a compact JWT without verifying its signature.
///
/// # Errors
///
/// Returns `Format` when the JWT does not have exactly 3 parts, or when the
/// header or payload is not base64url-encoded JSON.
pub fn decode_jwt<T: DeserializeOwned>(jwt: &str) -> Result<Jwt<T>> {
    let [header, payload, signature] = segments(jwt)?;
    Ok(Jwt {
        header: decode_segment(header)?,
        claims: decode_segment(payload)?,
        signature: Base64UrlUnpadded::decode_vec(signature)?,
    })
}

/// Decode the header of a JWT, or `None` if it is malformed.
#[must_use]
pub fn decode_header(jwt: &str) -> Option<Header> {
    let segment = jwt.split('.').next()?;
    match decode_segment(segment) {
        Ok(header) => Some(header),
        Err(e) => {
            tracing::warn!("cannot decode JWT header: {e}");
            None
        }
    }
}

/// How a [`Signer`] encodes ECDSA signatures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureEncoding {
    /// Fixed-size `r || s` as required by JOSE.
    #[default]
    Raw,

    /// ASN.1 DER `SEQUENCE { r INTEGER, s INTEGER }`, as produced by most
    /// platform keystores.
    Der,
}

/// Signing capability injected by the host. The wallet never holds private
/// key material itself.
pub trait Signer: Send + Sync {
    /// Sign `msg`, returning the signature bytes.
    fn try_sign(&self, msg: &[u8]) -> impl Future<Output = anyhow::Result<Vec<u8>>> + Send;

    /// The algorithm used by the signer.
    fn algorithm(&self) -> Algorithm;

    /// The public key of the signing key pair, as a JWK.
    fn public_jwk(&self) -> impl Future<Output = anyhow::Result<Jwk>> + Send;

    /// Encoding of signatures returned by [`Signer::try_sign`].
    fn encoding(&self) -> SignatureEncoding {
        SignatureEncoding::Raw
    }
}

/// Sign `claims` as a compact JWS.
///
/// # Errors
///
/// Returns an error if serialization or signing fails.
pub async fn encode_jws<T: Serialize + Send + Sync>(
    header: &Header, claims: &T, signer: &impl Signer,
) -> Result<String> {
    let header = Base64UrlUnpadded::encode_string(&serde_json::to_vec(header)?);
    let payload = Base64UrlUnpadded::encode_string(&serde_json::to_vec(claims)?);
    let signing_input = format!("{header}.{payload}");

    let mut signature =
        signer.try_sign(signing_input.as_bytes()).await.map_err(|e| Error::Signing(e.to_string()))?;
    if signer.encoding() == SignatureEncoding::Der
        && let Some(size) = signer.algorithm().coordinate_size()
    {
        signature = der_to_raw(&signature, size)?;
    }

    Ok(format!("{signing_input}.{}", Base64UrlUnpadded::encode_string(&signature)))
}
