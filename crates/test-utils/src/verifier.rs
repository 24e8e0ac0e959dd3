use anyhow::Result;
use base64ct::{Base64, Encoding};
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose,
    PKCS_ECDSA_P256_SHA256,
};
use serde_json::Value;
use wallet_jose::{Algorithm, Header, Jwk, PublicKey, Signer, encode_jws};

/// DNS name in the Verifier's leaf certificate.
pub const VERIFIER_DNS: &str = "verifier.example.com";

/// A Verifier holding a root CA and a leaf certificate for its DNS name.
/// Request objects are signed with the leaf key and carry the chain in
/// `x5c`.
#[derive(Clone)]
pub struct Verifier {
    signing_key: SigningKey,
    leaf: Vec<u8>,
    root: Vec<u8>,
}

impl Verifier {
    /// A Verifier certified for [`VERIFIER_DNS`].
    ///
    /// # Panics
    ///
    /// Panics if certificate generation fails.
    #[must_use]
    pub fn new() -> Self {
        Self::for_dns(VERIFIER_DNS)
    }

    /// A Verifier certified for `dns`.
    ///
    /// # Panics
    ///
    /// Panics if certificate generation fails.
    #[must_use]
    pub fn for_dns(dns: &str) -> Self {
        let root_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("should generate");
        let mut root_params = CertificateParams::new(Vec::<String>::new()).expect("should build");
        root_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        root_params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        root_params.distinguished_name.push(DnType::CommonName, "Test Root CA");
        let root = root_params.self_signed(&root_key).expect("should self-sign");

        let leaf_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("should generate");
        let mut leaf_params = CertificateParams::new(vec![dns.to_string()]).expect("should build");
        leaf_params.distinguished_name.push(DnType::CommonName, dns);
        let leaf = leaf_params.signed_by(&leaf_key, &root, &root_key).expect("should sign");

        let signing_key =
            SigningKey::from_pkcs8_der(&leaf_key.serialize_der()).expect("should import key");

        Self { signing_key, leaf: leaf.der().to_vec(), root: root.der().to_vec() }
    }

    /// The certificate chain as `x5c` entries, leaf first.
    #[must_use]
    pub fn x5c(&self) -> Vec<String> {
        vec![Base64::encode_string(&self.leaf), Base64::encode_string(&self.root)]
    }

    /// The certificate chain as a PEM bundle, as served at an `x5u` URL.
    #[must_use]
    pub fn pem_bundle(&self) -> String {
        [&self.leaf, &self.root]
            .iter()
            .map(|der| {
                let b64 = Base64::encode_string(der);
                let lines = b64.as_bytes().chunks(64).map(String::from_utf8_lossy).collect::<Vec<_>>();
                format!("-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n", lines.join("\n"))
            })
            .collect()
    }

    /// The root certificate, base64 DER.
    #[must_use]
    pub fn root(&self) -> String {
        Base64::encode_string(&self.root)
    }

    /// The leaf certificate's public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::P256(*self.signing_key.verifying_key())
    }

    /// Sign `claims` as a request object carrying the chain in `x5c`.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    pub async fn request_object(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::Es256).typ("oauth-authz-req+jwt");
        header.x5c = Some(self.x5c());
        encode_jws(&header, claims, self).await.expect("should sign")
    }

    /// Sign `claims` as a request object referencing the chain at `x5u`.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    pub async fn request_object_x5u(&self, claims: &Value, x5u: &str) -> String {
        let mut header = Header::new(Algorithm::Es256).typ("oauth-authz-req+jwt");
        header.x5u = Some(x5u.to_string());
        encode_jws(&header, claims, self).await.expect("should sign")
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer for Verifier {
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
