//! Form adapter
//!
//! Turns either the structured coordinate form or a block of free JSON text
//! into a [`Payload`], the single shape the dispatcher sends.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{PlannerError, Result};

/// Raw values of the structured form, exactly as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredForm {
    pub latitude: String,
    pub longitude: String,
    pub date: String,
}

/// Payload built from the structured form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredPayload {
    /// Latitude in decimal degrees, `NaN` when the field had no numeric prefix
    pub latitude: f64,
    /// Longitude in decimal degrees, `NaN` when the field had no numeric prefix
    pub longitude: f64,
    /// Date as entered, usually `YYYY-MM-DD`
    pub date: String,
}

/// Everything the dispatcher can send
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Structured(StructuredPayload),
    Freeform(Value),
}

impl StructuredForm {
    #[must_use]
    pub fn new(
        latitude: impl Into<String>,
        longitude: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            latitude: latitude.into(),
            longitude: longitude.into(),
            date: date.into(),
        }
    }

    /// Coerce the coordinate fields and build the payload.
    ///
    /// Coercion never fails: a field without a numeric prefix becomes `NaN`.
    #[must_use]
    pub fn into_payload(self) -> Payload {
        let payload = StructuredPayload {
            latitude: parse_float_prefix(&self.latitude),
            longitude: parse_float_prefix(&self.longitude),
            date: self.date,
        };
        debug!(
            latitude = payload.latitude,
            longitude = payload.longitude,
            date = %payload.date,
            "Built structured payload"
        );
        Payload::Structured(payload)
    }
}

/// Parse a free-text submission.
///
/// Surrounding whitespace is ignored. Empty text and text that is not JSON
/// are rejected before anything is sent.
pub fn parse_freeform(raw: &str) -> Result<Payload> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PlannerError::EmptyInput);
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| PlannerError::malformed_json(e.to_string()))?;
    debug!("Parsed free-text payload ({} bytes)", raw.len());
    Ok(Payload::Freeform(value))
}

impl Payload {
    /// Converge both variants to a single JSON value
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Payload::Structured(structured) => serde_json::json!({
                "latitude": coordinate(structured.latitude),
                "longitude": coordinate(structured.longitude),
                "date": structured.date,
            }),
            Payload::Freeform(value) => value.clone(),
        }
    }

    /// Serialized request body
    #[must_use]
    pub fn to_body(&self) -> String {
        self.to_value().to_string()
    }
}

/// A coordinate as JSON.stringify writes it: non-finite values become `null`
/// and whole numbers lose their fractional part (`10`, not `10.0`).
fn coordinate(value: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_992.0;

    if !value.is_finite() {
        Value::Null
    } else if value.fract() == 0.0 && value.abs() <= MAX_SAFE {
        // `-0.0 as i64` is 0, which is also what JSON.stringify prints
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

impl From<StructuredForm> for Payload {
    fn from(form: StructuredForm) -> Self {
        form.into_payload()
    }
}

/// Lenient float parsing in the manner of a browser's `parseFloat`.
///
/// Leading whitespace is skipped and the longest numeric prefix is used, so
/// `"12.5km"` is `12.5`. Input without such a prefix yields `NaN`.
#[must_use]
pub fn parse_float_prefix(input: &str) -> f64 {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    if s[end..].starts_with("Infinity") {
        return if bytes.first() == Some(&b'-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return f64::NAN;
    }

    // Exponent only counts when at least one digit follows it
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}
