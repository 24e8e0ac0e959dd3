use anyhow::Result;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use rand_core::OsRng;
use wallet_jose::{Algorithm, Jwk, PublicKey, SignatureEncoding, Signer};

/// The holder's P-256 key pair.
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    encoding: SignatureEncoding,
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet {
    /// A wallet with a fresh key returning raw signatures.
    #[must_use]
    pub fn new() -> Self {
        Self { signing_key: SigningKey::random(&mut OsRng), encoding: SignatureEncoding::Raw }
    }

    /// A wallet with a fresh key returning DER signatures, like a platform
    /// keystore.
    #[must_use]
    pub fn der() -> Self {
        Self { encoding: SignatureEncoding::Der, ..Self::new() }
    }

    /// The wallet's public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::P256(*self.signing_key.verifying_key())
    }

    /// The wallet's public key as a JWK.
    #[must_use]
    pub fn jwk(&self) -> Jwk {
        self.public_key().to_jwk()
    }
}

impl Signer for Wallet {
    async fn try_sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let signature: Signature = self.signing_key.sign(msg);
        match self.encoding {
            SignatureEncoding::Raw => Ok(signature.to_bytes().to_vec()),
            SignatureEncoding::Der => Ok(signature.to_der().as_bytes().to_vec()),
        }
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::Es256
    }

    async fn public_jwk(&self) -> Result<Jwk> {
        Ok(self.jwk())
    }

    fn encoding(&self) -> SignatureEncoding {
        self.encoding
    }
}
