//! # Self-Issued OP and `OpenID4VP` Types
//!
//! Authorization Request parameters, Verifier metadata, and the responses the
//! wallet returns.

mod metadata;
mod request;
mod response;

pub use self::metadata::*;
pub use self::request::*;
pub use self::response::*;
