//! # Provider Options
//!
//! Per-exchange configuration for the [`crate::OpenIdProvider`].

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use wallet_jose::TrustAnchors;

use crate::{Error, Result};

/// Options controlling token lifetimes, certificate trust and outbound HTTP.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderOption {
    /// Validity of a Self-Issued ID Token, in seconds.
    pub id_token_expires_in: i64,

    /// Validity window of a JWT Verifiable Presentation, in seconds.
    pub vp_expires_in: i64,

    /// Anchors used to validate a signed request's certificate chain.
    pub trust: TrustAnchors,

    /// Bound on each outbound request, in seconds.
    pub http_timeout: u64,
}

impl Default for ProviderOption {
    fn default() -> Self {
        Self {
            id_token_expires_in: 600,
            vp_expires_in: 7200,
            trust: TrustAnchors::Native,
            http_timeout: 30,
        }
    }
}

impl ProviderOption {
    /// ID Token validity as a duration.
    ///
    /// # Errors
    ///
    /// Returns `Error::ServerError` when the value is out of range.
    pub fn id_token_expiry(&self) -> Result<TimeDelta> {
        expiry("id_token_expires_in", self.id_token_expires_in)
    }

    /// JWT-VP validity as a duration.
    ///
    /// # Errors
    ///
    /// Returns `Error::ServerError` when the value is out of range.
    pub fn vp_expiry(&self) -> Result<TimeDelta> {
        expiry("vp_expires_in", self.vp_expires_in)
    }

    /// Outbound request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }
}

fn expiry(name: &str, seconds: i64) -> Result<TimeDelta> {
    TimeDelta::try_seconds(seconds)
        .ok_or_else(|| Error::ServerError(format!("{name} of {seconds}s is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opt: ProviderOption = serde_json::from_str("{}").expect("should deserialize");
        assert_eq!(opt, ProviderOption::default());
        assert_eq!(opt.id_token_expiry().unwrap(), TimeDelta::minutes(10));
        assert_eq!(opt.vp_expiry().unwrap(), TimeDelta::hours(2));
        assert_eq!(opt.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial() {
        let opt: ProviderOption =
            serde_json::from_str(r#"{"trust": "self_anchored", "http_timeout": 5}"#).unwrap();
        assert_eq!(opt.trust, TrustAnchors::SelfAnchored);
        assert_eq!(opt.http_timeout, 5);
        assert_eq!(opt.id_token_expires_in, 600);
    }

    #[test]
    fn out_of_range() {
        let opt = ProviderOption { id_token_expires_in: i64::MAX, ..ProviderOption::default() };
        assert!(matches!(opt.id_token_expiry(), Err(Error::ServerError(_))));

        let opt = ProviderOption { vp_expires_in: i64::MIN, ..ProviderOption::default() };
        assert!(matches!(opt.vp_expiry(), Err(Error::ServerError(_))));
    }
}
