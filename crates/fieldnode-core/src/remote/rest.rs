//! Value encoding for a realtime-database style REST endpoint.
//!
//! A path maps to `<base>/<path>.json`. GET returns the JSON value stored
//! there, or `null` when nothing is; PUT replaces it with the request body.

use alloc::string::String;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Number;

use super::RemoteError;

/// Build the URL of `path` under `base`, with an optional database secret.
pub fn value_url(base: &str, path: &str, secret: Option<&str>, out: &mut String) {
    out.clear();
    out.push_str(base.trim_end_matches('/'));
    out.push('/');
    out.push_str(path.trim_start_matches('/'));
    out.push_str(".json");
    if let Some(secret) = secret.filter(|s| !s.is_empty()) {
        out.push_str("?auth=");
        out.push_str(secret);
    }
}

/// Encode `value` as a request body.
///
/// Non-finite floats encode as `null`, which clears the path.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, RemoteError> {
    serde_json::to_string(value).map_err(|_| RemoteError::Malformed)
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, RemoteError> {
    if body.trim().is_empty() {
        return Err(RemoteError::Empty);
    }
    match serde_json::from_str::<Option<T>>(body) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(RemoteError::Empty),
        Err(_) => Err(RemoteError::Malformed),
    }
}

pub fn parse_int(body: &str) -> Result<i32, RemoteError> {
    let number: Number = decode(body)?;
    if let Some(v) = number.as_i64() {
        return i32::try_from(v).map_err(|_| RemoteError::Malformed);
    }
    // Other clients may write whole numbers as floats.
    match number.as_f64() {
        Some(v) if v.fract() == 0.0 && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) => {
            Ok(v as i32)
        }
        _ => Err(RemoteError::Malformed),
    }
}

pub fn parse_float(body: &str) -> Result<f32, RemoteError> {
    decode(body)
}

pub fn parse_string(body: &str) -> Result<String, RemoteError> {
    decode(body)
}
