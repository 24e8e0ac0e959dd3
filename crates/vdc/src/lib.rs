//! # Verifiable Digital Credentials
//!
//! Credential formats handled by the wallet when presenting to a Verifier:
//!
//! - [`sd_jwt`]: IETF SD-JWT, including decoding of compact SD-JWTs and
//!   building key-bound presentations.
//! - [`w3c_vc`]: W3C Verifiable Credentials secured as JWTs (`jwt_vc_json`),
//!   presented inside a `jwt_vp_json` envelope.
//! - [`pex`]: DIF Presentation Exchange definitions and submissions, and
//!   matching of Input Descriptors against SD-JWT disclosures.

pub mod pex;
pub mod sd_jwt;
pub mod w3c_vc;

/// Credential format identifiers.
pub mod format {
    /// IETF SD-JWT VC.
    pub const VC_SD_JWT: &str = "vc+sd-jwt";

    /// IETF SD-JWT VC, media type used by later drafts.
    pub const DC_SD_JWT: &str = "dc+sd-jwt";

    /// W3C VC secured as a JWT.
    pub const JWT_VC_JSON: &str = "jwt_vc_json";

    /// W3C VP secured as a JWT.
    pub const JWT_VP_JSON: &str = "jwt_vp_json";
}
