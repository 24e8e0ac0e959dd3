//! # JSON Web Key
//!
//! Public keys as JWKs ([RFC7517]) and their conversion to verifying keys.
//!
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517

use std::fmt::{self, Debug};

use base64ct::{Base64UrlUnpadded, Encoding};
use ecdsa::signature::Verifier as _;
use rsa::pkcs1v15;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::{Algorithm, Error, Result};

/// Prefix of a JWK Thumbprint URI ([RFC9278]) using SHA-256.
///
/// [RFC9278]: https://www.rfc-editor.org/rfc/rfc9278
pub const THUMBPRINT_URI_PREFIX: &str = "urn:ietf:params:oauth:jwk-thumbprint:sha-256:";

/// A public key in JWK form. Only the members needed for EC and RSA keys are
/// modelled.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type: `EC` or `RSA`.
    pub kty: String,

    /// Curve name for EC keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// RSA modulus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Intended algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Intended use (`sig` or `enc`).
    #[serde(rename = "use")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
}

impl Jwk {
    /// The RFC 7638 thumbprint (SHA-256, base64url) of the key.
    ///
    /// # Errors
    ///
    /// Returns an error if a required member is missing for the key type.
    pub fn thumbprint(&self) -> Result<String> {
        let missing = |m: &str| Error::Format(format!("JWK is missing `{m}`"));

        // members in lexicographic order, no whitespace
        let canonical = match self.kty.as_str() {
            "EC" => {
                let crv = self.crv.as_ref().ok_or_else(|| missing("crv"))?;
                let x = self.x.as_ref().ok_or_else(|| missing("x"))?;
                let y = self.y.as_ref().ok_or_else(|| missing("y"))?;
                format!(r#"{{"crv":"{crv}","kty":"EC","x":"{x}","y":"{y}"}}"#)
            }
            "RSA" => {
                let e = self.e.as_ref().ok_or_else(|| missing("e"))?;
                let n = self.n.as_ref().ok_or_else(|| missing("n"))?;
                format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#)
            }
            other => return Err(Error::UnsupportedAlgorithm(format!("key type {other}"))),
        };

        Ok(Base64UrlUnpadded::encode_string(&Sha256::digest(canonical.as_bytes())))
    }

    /// The JWK Thumbprint URI of the key, used as a Self-Issued `sub`.
    ///
    /// # Errors
    ///
    /// Returns an error if the thumbprint cannot be computed.
    pub fn thumbprint_uri(&self) -> Result<String> {
        Ok(format!("{THUMBPRINT_URI_PREFIX}{}", self.thumbprint()?))
    }
}

/// A JWK Set.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwks {
    /// Keys in the set.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Find the key used to sign a JWT. When the JWT carries no `kid`, a set
    /// holding a single key is unambiguous.
    #[must_use]
    pub fn find(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)),
            None if self.keys.len() == 1 => self.keys.first(),
            None => None,
        }
    }
}

/// A verifying key.
#[derive(Clone)]
pub enum PublicKey {
    /// RSA public key.
    Rsa(RsaPublicKey),
    /// NIST P-256 public key.
    P256(p256::ecdsa::VerifyingKey),
    /// NIST P-384 public key.
    P384(p384::ecdsa::VerifyingKey),
    /// NIST P-521 public key.
    P521(p521::ecdsa::VerifyingKey),
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.kind()).finish()
    }
}

impl PublicKey {
    /// Build an EC key from its curve name and SEC1-encoded point.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve is unsupported or the point is invalid.
    pub fn from_sec1(crv: &str, point: &[u8]) -> Result<Self> {
        let invalid = |e: ecdsa::Error| Error::Format(format!("invalid {crv} point: {e}"));
        match crv {
            "P-256" => Ok(Self::P256(p256::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(invalid)?)),
            "P-384" => Ok(Self::P384(p384::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(invalid)?)),
            "P-521" => Ok(Self::P521(p521::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(invalid)?)),
            other => Err(Error::UnsupportedAlgorithm(format!("curve {other}"))),
        }
    }

    /// Build an RSA key from its big-endian modulus and exponent.
    ///
    /// # Errors
    ///
    /// Returns an error if the components do not form a valid RSA key.
    pub fn from_rsa_components(n: &[u8], e: &[u8]) -> Result<Self> {
        let key = RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
            .map_err(|e| Error::Format(format!("invalid RSA key: {e}")))?;
        Ok(Self::Rsa(key))
    }

    /// Convert a JWK to a verifying key.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWK is incomplete or of an unsupported type.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let member = |m: &Option<String>, name: &str| -> Result<Vec<u8>> {
            let value = m.as_ref().ok_or_else(|| Error::Format(format!("JWK is missing `{name}`")))?;
            Ok(Base64UrlUnpadded::decode_vec(value)?)
        };

        match jwk.kty.as_str() {
            "EC" => {
                let crv = jwk.crv.as_deref().unwrap_or_default();
                let mut sec1 = vec![0x04];
                sec1.extend(member(&jwk.x, "x")?);
                sec1.extend(member(&jwk.y, "y")?);
                Self::from_sec1(crv, &sec1)
            }
            "RSA" => Self::from_rsa_components(&member(&jwk.n, "n")?, &member(&jwk.e, "e")?),
            other => Err(Error::UnsupportedAlgorithm(format!("key type {other}"))),
        }
    }

    /// Express the key as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        match self {
            Self::Rsa(key) => Jwk {
                kty: "RSA".to_string(),
                n: Some(Base64UrlUnpadded::encode_string(&key.n().to_bytes_be())),
                e: Some(Base64UrlUnpadded::encode_string(&key.e().to_bytes_be())),
                ..Jwk::default()
            },
            Self::P256(key) => ec_jwk("P-256", key.to_encoded_point(false).as_bytes()),
            Self::P384(key) => ec_jwk("P-384", key.to_encoded_point(false).as_bytes()),
            Self::P521(key) => ec_jwk("P-521", key.to_encoded_point(false).as_bytes()),
        }
    }

    /// Verify `sig` over `msg` using `alg`. The algorithm must match the key
    /// type: RSA keys verify `RS*`, EC keys verify the `ES*` for their curve.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAlgorithm` for a mismatched key/algorithm pair and
    /// `Verification` when the signature is invalid.
    pub fn verify(&self, alg: Algorithm, msg: &[u8], sig: &[u8]) -> Result<()> {
        let failed = |e: ecdsa::Error| Error::Verification(e.to_string());

        match (self, alg) {
            (Self::Rsa(key), Algorithm::Rs256) => verify_rsa::<Sha256>(key, msg, sig),
            (Self::Rsa(key), Algorithm::Rs384) => verify_rsa::<Sha384>(key, msg, sig),
            (Self::Rsa(key), Algorithm::Rs512) => verify_rsa::<Sha512>(key, msg, sig),
            (Self::P256(key), Algorithm::Es256) => {
                let sig = p256::ecdsa::Signature::from_slice(sig).map_err(failed)?;
                key.verify(msg, &sig).map_err(failed)
            }
            (Self::P384(key), Algorithm::Es384) => {
                let sig = p384::ecdsa::Signature::from_slice(sig).map_err(failed)?;
                key.verify(msg, &sig).map_err(failed)
            }
            (Self::P521(key), Algorithm::Es512) => {
                let sig = p521::ecdsa::Signature::from_slice(sig).map_err(failed)?;
                key.verify(msg, &sig).map_err(failed)
            }
            (key, alg) => {
                Err(Error::UnsupportedAlgorithm(format!("{alg} with {} key", key.kind())))
            }
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA",
            Self::P256(_) => "P-256",
            Self::P384(_) => "P-384",
            Self::P521(_) => "P-521",
        }
    }
}

// `sec1` is an uncompressed point: 0x04 || x || y
fn ec_jwk(crv: &str, sec1: &[u8]) -> Jwk {
    let coords = sec1.get(1..).unwrap_or_default();
    let (x, y) = coords.split_at(coords.len() / 2);
    Jwk {
        kty: "EC".to_string(),
        crv: Some(crv.to_string()),
        x: Some(Base64UrlUnpadded::encode_string(x)),
        y: Some(Base64UrlUnpadded::encode_string(y)),
        ..Jwk::default()
    }
}

fn verify_rsa<D>(key: &RsaPublicKey, msg: &[u8], sig: &[u8]) -> Result<()>
where
    D: Digest + sha2::digest::const_oid::AssociatedOid,
{
    use rsa::signature::Verifier as _;

    let verifying_key = pkcs1v15::VerifyingKey::<D>::new(key.clone());
    let signature = pkcs1v15::Signature::try_from(sig)
        .map_err(|e| Error::Verification(format!("malformed RSA signature: {e}")))?;
    verifying_key.verify(msg, &signature).map_err(|e| Error::Verification(e.to_string()))
}
