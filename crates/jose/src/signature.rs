//! # ECDSA Signature Encoding
//!
//! Conversion between ASN.1 DER and the fixed-size `r || s` form used by JOSE.

use crate::{Algorithm, Error, Result};

/// Convert a DER-encoded ECDSA signature to JOSE raw form, each of `r` and `s`
/// left-padded to `size` bytes.
///
/// Parsing is lenient about the integer encodings emitted by some keystores:
/// superfluous leading zero bytes are stripped before padding.
///
/// # Errors
///
/// Returns `Format` when the input is not a DER `SEQUENCE` of two `INTEGER`s or
/// when an integer does not fit in `size` bytes.
pub fn der_to_raw(der: &[u8], size: usize) -> Result<Vec<u8>> {
    let malformed = |msg: &str| Error::Format(format!("DER signature: {msg}"));

    let (tag, body, rest) = read_tlv(der).ok_or_else(|| malformed("truncated sequence"))?;
    if tag != 0x30 || !rest.is_empty() {
        return Err(malformed("expected a single SEQUENCE"));
    }
    let (tag_r, r, body) = read_tlv(body).ok_or_else(|| malformed("truncated r"))?;
    let (tag_s, s, body) = read_tlv(body).ok_or_else(|| malformed("truncated s"))?;
    if tag_r != 0x02 || tag_s != 0x02 || !body.is_empty() {
        return Err(malformed("expected two INTEGERs"));
    }

    let mut raw = vec![0; size * 2];
    for (i, int) in [r, s].into_iter().enumerate() {
        let first = int.iter().position(|b| *b != 0).unwrap_or(int.len());
        let int = &int[first..];
        if int.len() > size {
            return Err(malformed("integer too large for curve"));
        }
        let end = size * (i + 1);
        raw[end - int.len()..end].copy_from_slice(int);
    }
    Ok(raw)
}

/// Convert a JOSE raw ECDSA signature for `alg` to DER.
///
/// # Errors
///
/// Returns `UnsupportedAlgorithm` for RSA algorithms and `Format` when `raw`
/// is not a valid signature for the curve.
pub fn raw_to_der(raw: &[u8], alg: Algorithm) -> Result<Vec<u8>> {
    let invalid = |e: ecdsa::Error| Error::Format(format!("raw signature: {e}"));
    let der = match alg {
        Algorithm::Es256 => {
            p256::ecdsa::Signature::from_slice(raw).map_err(invalid)?.to_der().as_bytes().to_vec()
        }
        Algorithm::Es384 => {
            p384::ecdsa::Signature::from_slice(raw).map_err(invalid)?.to_der().as_bytes().to_vec()
        }
        Algorithm::Es512 => {
            p521::ecdsa::Signature::from_slice(raw).map_err(invalid)?.to_der().as_bytes().to_vec()
        }
        other => return Err(Error::UnsupportedAlgorithm(format!("{other} is not ECDSA"))),
    };
    Ok(der)
}

// Read one tag-length-value. Supports short and long form lengths.
fn read_tlv(input: &[u8]) -> Option<(u8, &[u8], &[u8])> {
    let (&tag, input) = input.split_first()?;
    let (&len, mut input) = input.split_first()?;

    let len = if len & 0x80 == 0 {
        usize::from(len)
    } else {
        let count = usize::from(len & 0x7f);
        if count == 0 || count > 2 || input.len() < count {
            return None;
        }
        let (bytes, remaining) = input.split_at(count);
        input = remaining;
        bytes.iter().fold(0, |acc, b| (acc << 8) | usize::from(*b))
    };

    if input.len() < len {
        return None;
    }
    let (value, rest) = input.split_at(len);
    Some((tag, value, rest))
}
