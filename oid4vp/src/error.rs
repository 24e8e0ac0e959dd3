//! # `OpenID` Errors
//!
//! Errors raised while processing a Self-Issued OP authorization request and
//! responding to the Verifier. Each variant maps to an `OpenID` error code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `OpenID` error codes for Self-Issued OP and Verifiable Presentation
/// exchanges.
#[derive(Error, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "error", content = "error_description")]
pub enum Error {
    /// The request is missing a required parameter, includes an unsupported
    /// parameter value, or is otherwise malformed.
    #[error(r#"{{"error": "invalid_request", "error_description": "{0}"}}"#)]
    InvalidRequest(String),

    /// A by-reference parameter (`request_uri`, `client_metadata_uri`,
    /// `presentation_definition_uri`) could not be resolved.
    #[error(r#"{{"error": "invalid_request_uri", "error_description": "{0}"}}"#)]
    InvalidRequestUri(String),

    /// The Request Object signature, algorithm, or certificate chain is
    /// invalid.
    #[error(r#"{{"error": "invalid_request_object", "error_description": "{0}"}}"#)]
    InvalidRequestObject(String),

    /// The Verifier could not be identified: the `client_id` does not match
    /// the response URI or certificate, or its scheme is not supported.
    #[error(r#"{{"error": "invalid_client", "error_description": "{0}"}}"#)]
    InvalidClient(String),

    /// The requested response mode cannot be used for the credential format
    /// being presented.
    #[error(r#"{{"error": "unsupported_response_mode", "error_description": "{0}"}}"#)]
    UnsupportedResponseMode(String),

    /// The Wallet does not support the format of a submitted credential.
    #[error(r#"{{"error": "vp_formats_not_supported", "error_description": "{0}"}}"#)]
    VpFormatsNotSupported(String),

    /// The Verifier rejected the Authorization Response.
    #[error(r#"{{"error": "access_denied", "error_description": "{0}"}}"#)]
    AccessDenied(String),

    /// A transient network failure. The operation may succeed if retried.
    #[error(r#"{{"error": "temporarily_unavailable", "error_description": "{0}"}}"#)]
    TemporarilyUnavailable(String),

    /// An unexpected condition prevented the request from being fulfilled.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    ServerError(String),
}

impl Error {
    /// Returns `true` when the failure is transient and the caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TemporarilyUnavailable(_))
    }

    fn with_context(&self, context: &str) -> Self {
        let ctx = |e: &str| format!("{context}: {e}");
        match self {
            Self::InvalidRequest(e) => Self::InvalidRequest(ctx(e)),
            Self::InvalidRequestUri(e) => Self::InvalidRequestUri(ctx(e)),
            Self::InvalidRequestObject(e) => Self::InvalidRequestObject(ctx(e)),
            Self::InvalidClient(e) => Self::InvalidClient(ctx(e)),
            Self::UnsupportedResponseMode(e) => Self::UnsupportedResponseMode(ctx(e)),
            Self::VpFormatsNotSupported(e) => Self::VpFormatsNotSupported(ctx(e)),
            Self::AccessDenied(e) => Self::AccessDenied(ctx(e)),
            Self::TemporarilyUnavailable(e) => Self::TemporarilyUnavailable(ctx(e)),
            Self::ServerError(e) => Self::ServerError(ctx(e)),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        // outermost context, when the error has been wrapped
        let context = (err.chain().count() > 1).then(|| err.to_string());

        if let Some(e) = err.downcast_ref::<Self>() {
            return context.map_or_else(|| e.clone(), |c| e.with_context(&c));
        }
        if let Some(e) = err.downcast_ref::<wallet_core::http::Error>() {
            return Self::from(e.clone());
        }
        if let Some(e) = err.downcast_ref::<wallet_jose::Error>() {
            return match e {
                wallet_jose::Error::Fetch(fetch) => Self::from(fetch.clone()),
                other => Self::InvalidRequestObject(other.to_string()),
            };
        }

        let stack = err.chain().fold(String::new(), |cause, e| format!("{cause} -> {e}"));
        let stack = stack.trim_start_matches(" -> ").to_string();
        Self::ServerError(stack)
    }
}

impl From<wallet_core::http::Error> for Error {
    fn from(err: wallet_core::http::Error) -> Self {
        if err.is_retryable() {
            Self::TemporarilyUnavailable(err.to_string())
        } else {
            Self::ServerError(err.to_string())
        }
    }
}

/// Construct an `Error::InvalidRequest` error from a string or existing error
/// value.
macro_rules! invalid {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::InvalidRequest(format!($fmt, $($arg)*))
    };
    ($err:expr $(,)?) => {
        $crate::Error::InvalidRequest(format!($err))
    };
}
pub(crate) use invalid;

/// Construct an `Error::InvalidClient` error.
macro_rules! client {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::InvalidClient(format!($fmt, $($arg)*))
    };
    ($err:expr $(,)?) => {
        $crate::Error::InvalidClient(format!($err))
    };
}
pub(crate) use client;
