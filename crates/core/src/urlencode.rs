//! # Url Encoder/Decoder
//!
//! Provides encoding and decoding of `application/x-www-form-urlencoded`
//! HTML query strings and forms.
//!
//! Decoding is deliberately loose: authorization requests arrive as custom
//! scheme URIs whose parameter values may be booleans, integers or JSON
//! objects carried as plain query strings.

use anyhow::{Result, anyhow};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;
use serde_json::{Map, Number, Value};

const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'_').remove(b'-').remove(b'~');

/// Create an `application/x-www-form-urlencoded` representation of the
/// provided value suitable for use in an HTML query string.
///
/// # Errors
///
/// Will return an error if any of the object-type fields cannot be
/// serialized to JSON and URL-encoded.
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    let encoded = form_encode(value)?
        .iter()
        .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, UNRESERVED)))
        .collect::<Vec<String>>();
    Ok(encoded.join("&"))
}

/// Convert the provided value into form fields. String values are used as-is,
/// every other value is serialized as JSON text. `null` values are omitted.
///
/// # Errors
///
/// Will return an error if the value cannot be serialized to a JSON object.
pub fn form_encode<T: Serialize>(value: &T) -> Result<Vec<(String, String)>> {
    let val = serde_json::to_value(value)?;
    let map = val.as_object().ok_or_else(|| anyhow!("expected an object"))?;
    let encoded = map
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let s = if let Value::String(s) = v { s.clone() } else { v.to_string() };
            (k.clone(), s)
        })
        .collect::<Vec<(String, String)>>();
    Ok(encoded)
}

/// Decode a query string into a loosely-typed JSON map.
///
/// Each value is percent-decoded and then coerced:
///
/// * `true`/`false` become booleans,
/// * integer-looking values become numbers,
/// * values that look like `{...}` and parse as JSON become objects,
/// * everything else remains a string.
///
/// Coercion never fails. A value that cannot be coerced is kept as a string.
#[must_use]
pub fn decode_query(query: &str) -> Map<String, Value> {
    decode_query_strings(query)
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => (key, coerce(&s)),
            other => (key, other),
        })
        .collect()
}

/// Decode a query string into percent-decoded string values, leaving any
/// typing to the caller.
#[must_use]
pub fn decode_query_strings(query: &str) -> Map<String, Value> {
    let mut map = Map::new();

    for part in query.split('&').filter(|p| !p.is_empty()) {
        let (key, encoded) = part.split_once('=').unwrap_or((part, ""));
        map.insert(decode_component(key), Value::String(decode_component(encoded)));
    }

    map
}

fn decode_component(s: &str) -> String {
    let plus_decoded = s.replace('+', " ");
    percent_decode_str(&plus_decoded).decode_utf8_lossy().to_string()
}

/// Best-effort conversion of a decoded query value to a typed JSON value.
#[must_use]
pub fn coerce(value: &str) -> Value {
    match value {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    // only canonical integers, so `007` or `+1` survive a round trip
    if let Ok(n) = value.parse::<i64>()
        && n.to_string() == value
    {
        return Value::Number(Number::from(n));
    }
    let trimmed = value.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(obj @ Value::Object(_)) => return obj,
            Ok(_) | Err(_) => {
                tracing::warn!("query value looks like JSON but does not parse, keeping as string");
            }
        }
    }
    Value::String(value.to_string())
}
