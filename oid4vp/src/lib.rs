//! # Self-Issued OpenID Provider
//!
//! The wallet side of [Self-Issued OpenID Provider v2](https://openid.net/specs/openid-connect-self-issued-v2-1_0.html)
//! and [OpenID for Verifiable Presentations](https://openid.net/specs/openid-4-verifiable-presentations-1_0.html)
//! exchanges.
//!
//! An exchange starts with a custom-scheme request URI such as
//! `openid4vp://?client_id=...&request_uri=...`. The [`OpenIdProvider`]
//! resolves the request's by-reference parameters, verifies the Verifier's
//! identity, and then responds with either a Self-Issued ID Token or a VP Token
//! built from credentials the holder selected.
//!
//! ```rust,ignore
//! let provider = OpenIdProvider::new(uri, &signer, ProviderOption::default())?;
//! let provider = provider.process_authorization_request().await?;
//!
//! let verifier = &provider.result().registration_metadata.client_name;
//! let (post_result, shared) = provider.respond_vp_response(&credentials).await?;
//! ```
//!
//! Key material never enters the crate: signing is delegated to a host
//! supplied [`jose::Signer`].

pub mod config;
pub mod provider;
pub mod resolve;
pub mod types;

mod error;
mod handlers;

pub use {wallet_core as core, wallet_jose as jose, wallet_vdc as vdc};

pub use self::config::ProviderOption;
pub use self::error::Error;
pub use self::provider::{OpenIdProvider, ProcessSiopRequestResult};
pub use self::types::*;

/// Result type for Self-Issued OP and `OpenID4VP` exchanges.
pub type Result<T, E = Error> = anyhow::Result<T, E>;
