//! # JOSE Errors

use thiserror::Error;

/// Result type for JOSE operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while decoding, signing or verifying JWTs.
#[derive(Error, Clone, Debug)]
pub enum Error {
    /// The JWT (or one of its parts) is structurally invalid.
    #[error("invalid JWT format: {0}")]
    Format(String),

    /// The `alg` header, key type, or combination of the two is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature did not verify against the resolved public key.
    #[error("signature verification failed: {0}")]
    Verification(String),

    /// A certificate could not be parsed, or the chain is not trusted.
    #[error("certificate validation failed: {0}")]
    Certificate(String),

    /// No key matching the JWT could be found.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The injected signer failed to produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Fetching remote key material failed.
    #[error(transparent)]
    Fetch(#[from] wallet_core::http::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err.to_string())
    }
}

impl From<base64ct::Error> for Error {
    fn from(err: base64ct::Error) -> Self {
        Self::Format(format!("invalid base64url: {err}"))
    }
}
