//! # Handlers
//!
//! The phases of an exchange, implemented on [`crate::OpenIdProvider`]:
//! processing the Authorization Request, then responding with either a
//! Self-Issued ID Token or a VP Token. Responses are posted to the Verifier
//! and the outcome returned as a [`crate::PostResult`].

mod id_token;
mod post;
mod process;
mod vp_token;
