//! Value coercion: raw response text → [`SensorValue`].
//!
//! Numeric domains read the *leading* number of the text and ignore any
//! trailing unit or noise (`"120cm"` → `120`, `"3.7V"` → `3.7`).  Text is
//! passed through verbatim.  Booleans are `true` only for the exact literal
//! `"on"`.

use dinnye_types::{ResultDomain, SensorValue};
use thiserror::Error;

/// The response text does not start with a number of the expected kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoerceError {
    #[error("expected an integer, got {0:?}")]
    NotAnInteger(String),

    #[error("expected a number, got {0:?}")]
    NotAFloat(String),
}

/// Coerce `raw` into `domain`.
///
/// # Errors
///
/// Returns [`CoerceError`] when a numeric domain finds no leading number.
/// Text and boolean coercion never fail.
pub fn coerce(domain: ResultDomain, raw: &str) -> Result<SensorValue, CoerceError> {
    match domain {
        ResultDomain::Integer => leading_integer(raw)
            .map(SensorValue::Integer)
            .ok_or_else(|| CoerceError::NotAnInteger(raw.to_string())),
        ResultDomain::Float => leading_float(raw)
            .map(SensorValue::Float)
            .ok_or_else(|| CoerceError::NotAFloat(raw.to_string())),
        ResultDomain::Text => Ok(SensorValue::Text(raw.to_string())),
        ResultDomain::Boolean => Ok(SensorValue::Boolean(raw == "on")),
    }
}

/// Leading optionally-signed decimal integer, after leading whitespace.
pub fn leading_integer(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let start = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let end = start + count_digits(&bytes[start..]);
    if end == start {
        return None;
    }
    s[..end].parse().ok()
}

/// Leading decimal floating-point literal (`[sign] digits [. digits] [e [sign] digits]`),
/// after leading whitespace.
pub fn leading_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = count_digits(&bytes[exp.min(bytes.len())..]);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    s[..end].parse().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
