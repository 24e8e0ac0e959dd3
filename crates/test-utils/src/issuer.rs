use anyhow::Result;
use chrono::Utc;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use rand_core::OsRng;
use serde_json::{Map, Value, json};
use wallet_jose::{Algorithm, Header, Jwk, PublicKey, Signer, encode_jws};
use wallet_vdc::sd_jwt::Disclosure;

/// Identifier of the test Issuer.
pub const ISSUER_ID: &str = "https://issuer.example.com";

/// A credential Issuer with a P-256 key.
#[derive(Clone)]
pub struct Issuer {
    signing_key: SigningKey,
}

impl Default for Issuer {
    fn default() -> Self {
        Self::new()
    }
}

impl Issuer {
    /// An Issuer with a fresh key.
    #[must_use]
    pub fn new() -> Self {
        Self { signing_key: SigningKey::random(&mut OsRng) }
    }

    /// Issue an SD-JWT VC bound to `holder`, with each of `claims`
    /// selectively disclosable. The result ends with `~` (no KB-JWT).
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    pub async fn sd_jwt(&self, holder: &Jwk, claims: &[(&str, Value)]) -> String {
        let disclosures = claims
            .iter()
            .map(|(name, value)| Disclosure::new(*name, value.clone()).expect("should encode"))
            .collect::<Vec<_>>();

        let payload = json!({
            "iss": ISSUER_ID,
            "iat": Utc::now().timestamp(),
            "vct": "https://credentials.example.com/identity_credential",
            "_sd_alg": "sha-256",
            "_sd": disclosures.iter().map(Disclosure::digest).collect::<Vec<_>>(),
            "cnf": {"jwk": holder},
        });
        let header = Header::new(Algorithm::Es256).typ("vc+sd-jwt");
        let issued = encode_jws(&header, &payload, self).await.expect("should sign");

        let mut sd_jwt = format!("{issued}~");
        for disclosure in &disclosures {
            sd_jwt.push_str(&disclosure.disclosure);
            sd_jwt.push('~');
        }
        sd_jwt
    }

    /// Issue a `jwt_vc_json` credential for `subject` with `claims` as its
    /// credential subject.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    pub async fn jwt_vc(&self, subject: &str, claims: Map<String, Value>) -> String {
        let mut credential_subject = claims;
        credential_subject.insert("id".to_string(), Value::String(subject.to_string()));

        let payload = json!({
            "iss": ISSUER_ID,
            "sub": subject,
            "nbf": Utc::now().timestamp(),
            "vc": {
                "@context": ["https://www.w3.org/2018/credentials/v1"],
                "type": ["VerifiableCredential", "IdentityCredential"],
                "credentialSubject": credential_subject,
            },
        });
        let header = Header::new(Algorithm::Es256).typ("JWT");
        encode_jws(&header, &payload, self).await.expect("should sign")
    }

    /// The Issuer's public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::P256(*self.signing_key.verifying_key())
    }
}

impl Signer for Issuer {
    async fn try_sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let signature: Signature = self.signing_key.sign(msg);
        Ok(signature.to_bytes().to_vec())
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::Es256
    }

    async fn public_jwk(&self) -> Result<Jwk> {
        Ok(self.public_key().to_jwk())
    }
}
