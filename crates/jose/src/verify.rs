//! # Verification
//!
//! Signature verification against a known key, an `x5c`/`x5u` certificate
//! chain, or a remote JWK Set.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::de::DeserializeOwned;
use tracing::instrument;
use wallet_core::http::HttpClient;

use crate::jwt::segments;
use crate::x509::{self, TrustAnchors};
use crate::{Error, Jwks, Jwt, PublicKey, Result, decode_jwt};

/// Verify `jwt` with `key` and decode it.
///
/// The algorithm is taken from the `alg` header and must be compatible with
/// the key type.
///
/// # Errors
///
/// Returns `Format` for a malformed JWT, `UnsupportedAlgorithm` for an
/// unsupported `alg` or key/algorithm pair, and `Verification` when the
/// signature does not verify.
pub fn verify_jwt<T: DeserializeOwned>(jwt: &str, key: &PublicKey) -> Result<Jwt<T>> {
    let decoded = decode_jwt::<T>(jwt)?;
    let alg = decoded.header.algorithm()?;

    let [header, payload, _] = segments(jwt)?;
    let signing_input = format!("{header}.{payload}");
    key.verify(alg, signing_input.as_bytes(), &decoded.signature)?;

    Ok(decoded)
}

/// Verify `jwt` with the leaf certificate of the chain carried in its `x5c`
/// header (or fetched from `x5u`), then validate the chain against `trust`.
///
/// Both checks must succeed. The DER-encoded chain is returned with the
/// decoded JWT.
///
/// # Errors
///
/// Returns an error if no chain is referenced, the signature does not verify,
/// or the chain is not trusted.
#[instrument(level = "debug", skip_all)]
pub async fn verify_jwt_with_x509<T: DeserializeOwned>(
    jwt: &str, http: &HttpClient, trust: &TrustAnchors,
) -> Result<(Jwt<T>, Vec<Vec<u8>>)> {
    let [header, ..] = segments(jwt)?;
    let header = serde_json::from_slice(&Base64UrlUnpadded::decode_vec(header)?)?;

    let chain = x509::certificates(&header, http).await?;
    let Some(leaf) = chain.first() else {
        return Err(Error::Certificate("JWT has no x5c or x5u header".to_string()));
    };

    let key = x509::leaf_public_key(leaf)?;
    let decoded = verify_jwt(jwt, &key)?;
    x509::validate_chain(&chain, trust)?;

    tracing::debug!(len = chain.len(), "signature and chain verified");
    Ok((decoded, chain))
}

/// Verify `jwt` with the key in the JWK Set at `jwks_uri` matching its `kid`.
///
/// # Errors
///
/// Returns an error if the set cannot be fetched, no key matches, or the
/// signature does not verify.
#[instrument(level = "debug", skip(jwt, http))]
pub async fn verify_jwt_with_jwks<T: DeserializeOwned>(
    jwt: &str, jwks_uri: &str, http: &HttpClient,
) -> Result<Jwt<T>> {
    let [header, ..] = segments(jwt)?;
    let header: crate::Header =
        serde_json::from_slice(&Base64UrlUnpadded::decode_vec(header)?)?;

    let jwks: Jwks = http.get_json(jwks_uri).await?;
    let jwk = jwks.find(header.kid.as_deref()).ok_or_else(|| {
        Error::KeyNotFound(format!("no key for kid {:?} at {jwks_uri}", header.kid))
    })?;

    verify_jwt(jwt, &PublicKey::from_jwk(jwk)?)
}
