//! # X.509
//!
//! Certificate chain handling for JWTs carrying `x5c` or `x5u` headers.

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use wallet_core::http::HttpClient;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::pem::Pem;
use x509_parser::prelude::FromDer;
use x509_parser::public_key;

use crate::{Error, Header, PublicKey, Result};

const OID_P256: &str = "1.2.840.10045.3.1.7";
const OID_P384: &str = "1.3.132.0.34";
const OID_P521: &str = "1.3.132.0.35";

/// Anchors a certificate chain must terminate in.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrustAnchors {
    /// The chain's last certificate is trusted as-is. Test use only.
    SelfAnchored,

    /// The platform's trusted CA store.
    #[default]
    Native,

    /// Explicitly pinned anchors, each base64 DER.
    Certificates(Vec<String>),
}

impl TrustAnchors {
    fn load(&self) -> Result<Vec<Vec<u8>>> {
        match self {
            Self::SelfAnchored => Ok(vec![]),
            Self::Native => {
                let native = rustls_native_certs::load_native_certs();
                for e in &native.errors {
                    tracing::warn!("skipping platform certificate: {e}");
                }
                Ok(native.certs.into_iter().map(|c| c.as_ref().to_vec()).collect())
            }
            Self::Certificates(anchors) => anchors.iter().map(|a| decode_certificate(a)).collect(),
        }
    }
}

/// Resolve the certificate chain referenced by a JWT header: inline `x5c`
/// entries, or else the PEM bundle at `x5u`. The chain is returned as DER,
/// leaf first, and is empty when the header references neither.
///
/// # Errors
///
/// Returns an error if an entry cannot be decoded or the bundle cannot be
/// fetched.
#[instrument(level = "debug", skip_all)]
pub async fn certificates(header: &Header, http: &HttpClient) -> Result<Vec<Vec<u8>>> {
    if let Some(x5c) = &header.x5c {
        return x5c_certificates(x5c);
    }
    if let Some(x5u) = &header.x5u {
        tracing::debug!(x5u, "fetching certificate bundle");
        let bundle = http.get_text(x5u).await?;
        return pem_certificates(&bundle);
    }
    Ok(vec![])
}

/// Decode `x5c` entries. Entries may be base64 DER or PEM.
///
/// # Errors
///
/// Returns `Certificate` if an entry cannot be decoded.
pub fn x5c_certificates(x5c: &[String]) -> Result<Vec<Vec<u8>>> {
    let mut chain = vec![];
    for entry in x5c {
        if entry.contains("-----BEGIN") {
            chain.extend(pem_certificates(entry)?);
        } else {
            chain.push(decode_certificate(entry)?);
        }
    }
    Ok(chain)
}

/// Extract every certificate from a PEM bundle.
///
/// # Errors
///
/// Returns `Certificate` if a PEM block is malformed.
pub fn pem_certificates(pem: &str) -> Result<Vec<Vec<u8>>> {
    Pem::iter_from_buffer(pem.as_bytes())
        .map(|p| p.map(|p| p.contents).map_err(|e| Error::Certificate(format!("invalid PEM: {e}"))))
        .collect()
}

fn decode_certificate(b64: &str) -> Result<Vec<u8>> {
    let compact = b64.split_whitespace().collect::<String>();
    Base64::decode_vec(&compact).map_err(|e| Error::Certificate(format!("invalid base64 DER: {e}")))
}

fn parse(der: &[u8]) -> Result<X509Certificate<'_>> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| Error::Certificate(format!("cannot parse certificate: {e}")))?;
    Ok(cert)
}

/// The public key of a DER certificate.
///
/// # Errors
///
/// Returns an error when the key is neither RSA nor EC over a supported curve.
pub fn leaf_public_key(der: &[u8]) -> Result<PublicKey> {
    let cert = parse(der)?;
    let spki = cert.public_key();
    let parsed = spki.parsed().map_err(|e| Error::Certificate(format!("public key: {e}")))?;

    match parsed {
        public_key::PublicKey::RSA(rsa) => PublicKey::from_rsa_components(rsa.modulus, rsa.exponent),
        public_key::PublicKey::EC(point) => {
            let curve = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|p| p.as_oid().ok())
                .map(|oid| oid.to_id_string())
                .unwrap_or_default();
            let crv = match curve.as_str() {
                OID_P256 => "P-256",
                OID_P384 => "P-384",
                OID_P521 => "P-521",
                other => return Err(Error::UnsupportedAlgorithm(format!("curve OID {other}"))),
            };
            PublicKey::from_sec1(crv, point.data())
        }
        _ => Err(Error::UnsupportedAlgorithm("certificate key type".to_string())),
    }
}

/// The `dNSName` entries of a certificate's Subject Alternative Name.
///
/// # Errors
///
/// Returns an error if the certificate or its SAN extension is malformed.
pub fn san_dns_names(der: &[u8]) -> Result<Vec<String>> {
    let cert = parse(der)?;
    let san = cert
        .subject_alternative_name()
        .map_err(|e| Error::Certificate(format!("subject alternative name: {e}")))?;

    let Some(san) = san else {
        return Ok(vec![]);
    };
    Ok(san
        .value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some((*dns).to_string()),
            _ => None,
        })
        .collect())
}

/// Validate a DER certificate chain (leaf first).
///
/// Every certificate must be within its validity period and signed by the
/// next one in the chain. Each issuing certificate must be a CA permitted to
/// sign certificates, with a path length constraint (if any) that admits the
/// certificates below it. The last certificate must either be a trust anchor
/// itself or be signed by one.
///
/// # Errors
///
/// Returns `Certificate` describing the first failed check.
#[instrument(level = "debug", skip_all, fields(len = chain.len()))]
pub fn validate_chain(chain: &[Vec<u8>], trust: &TrustAnchors) -> Result<()> {
    if chain.is_empty() {
        return Err(Error::Certificate("empty certificate chain".to_string()));
    }
    let certs = chain.iter().map(|der| parse(der)).collect::<Result<Vec<_>>>()?;

    for (i, cert) in certs.iter().enumerate() {
        if !cert.validity().is_valid() {
            return Err(Error::Certificate(format!("certificate {i} is expired or not yet valid")));
        }
        if let Some(issuer) = certs.get(i + 1) {
            check_issued_by(cert, issuer).map_err(|e| {
                Error::Certificate(format!("certificate {i} is not issued by its successor: {e}"))
            })?;
            // `i` intermediates sit between the issuer and the leaf
            check_can_issue(issuer, i).map_err(|e| {
                Error::Certificate(format!("certificate {} cannot issue: {e}", i + 1))
            })?;
        }
    }

    let Some(last) = certs.last() else {
        return Err(Error::Certificate("empty certificate chain".to_string()));
    };
    if *trust == TrustAnchors::SelfAnchored {
        tracing::debug!("trusting the chain's own root");
        return Ok(());
    }

    let anchors = trust.load()?;
    let last_der = chain.last().map(Vec::as_slice).unwrap_or_default();
    for der in &anchors {
        if der.as_slice() == last_der {
            return Ok(());
        }
        let Ok((_, anchor)) = X509Certificate::from_der(der) else {
            continue;
        };
        if check_issued_by(last, &anchor).is_ok() {
            return Ok(());
        }
    }
    Err(Error::Certificate("chain does not terminate in a trusted anchor".to_string()))
}

fn check_issued_by(cert: &X509Certificate<'_>, issuer: &X509Certificate<'_>) -> Result<(), String> {
    if cert.issuer().as_raw() != issuer.subject().as_raw() {
        return Err("issuer name mismatch".to_string());
    }
    cert.verify_signature(Some(issuer.public_key())).map_err(|e| e.to_string())
}

fn check_can_issue(issuer: &X509Certificate<'_>, below: usize) -> Result<(), String> {
    let constraints = issuer.basic_constraints().map_err(|e| e.to_string())?;
    let Some(constraints) = constraints.filter(|bc| bc.value.ca) else {
        return Err("not a CA".to_string());
    };
    let max = constraints.value.path_len_constraint.and_then(|max| usize::try_from(max).ok());
    if let Some(max) = max.filter(|max| below > *max) {
        return Err(format!("path length {below} exceeds {max}"));
    }

    let usage = issuer.key_usage().map_err(|e| e.to_string())?;
    if !usage.is_some_and(|ku| ku.value.key_cert_sign()) {
        return Err("key usage does not permit certificate signing".to_string());
    }
    Ok(())
}
