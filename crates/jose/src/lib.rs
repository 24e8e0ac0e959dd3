//! # JOSE
//!
//! JSON Object Signing and Encryption support for the wallet: decoding of
//! compact JWTs, signing through an injected [`Signer`], and verification of
//! signatures using keys resolved from an embedded (`x5c`) or remote (`x5u`)
//! certificate chain, or from a remote JWK Set.
//!
//! Supported algorithms are `RS256`, `RS384`, `RS512` (RSASSA-PKCS1-v1_5) and
//! `ES256`, `ES384`, `ES512` (ECDSA over the NIST curves).

mod algorithm;
mod error;
mod jwk;
mod jwt;
pub mod signature;
mod verify;
pub mod x509;

pub use self::algorithm::Algorithm;
pub use self::error::{Error, Result};
pub use self::jwk::{Jwk, Jwks, PublicKey, THUMBPRINT_URI_PREFIX};
pub use self::jwt::{
    Header, Jwt, SignatureEncoding, Signer, decode_header, decode_jwt, encode_jws,
};
pub use self::verify::{verify_jwt, verify_jwt_with_jwks, verify_jwt_with_x509};
pub use self::x509::TrustAnchors;
