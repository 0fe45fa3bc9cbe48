//! Raw sample normalization.

use serde_json::Value;

use crate::types::{CanonicalRecord, RawSample};

/// Coerce a raw sample into the canonical record shape.
///
/// Never fails: a metric that is absent, null, or not a finite number
/// becomes `0.0`. Numeric strings are accepted.
pub fn normalize(raw: &RawSample) -> CanonicalRecord {
    CanonicalRecord {
        timestamp: raw.timestamp.clone(),
        temperature: coerce_metric(raw.temperature.as_ref()),
        humidity: coerce_metric(raw.humidity.as_ref()),
        city: raw.city.clone(),
    }
}

fn coerce_metric(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}
