// OpenRouter quotes prices as decimal strings in currency per single token
// (e.g. "0.000003"). Everything downstream works in currency per million tokens.

use serde_json::Value;

pub const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// Convert an upstream per-token price string to a per-million-token price.
///
/// Absent and empty strings stay absent. `"0"` is a real price and becomes `0.0`.
/// Unparsable or non-finite input is reported as absent rather than as an error.
pub fn normalize_price(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match parse_per_token(raw) {
        Ok(per_token) => Some(per_token * TOKENS_PER_UNIT),
        Err(reason) => {
            tracing::debug!(price = raw, %reason, "ignoring unparsable price");
            None
        }
    }
}

fn parse_per_token(raw: &str) -> std::result::Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err("not a finite number".to_string())
    }
}

/// Normalize a price field of an upstream pricing object.
///
/// Accepts the documented string form and, leniently, a bare JSON number.
pub fn price_field(pricing: Option<&Value>, key: &str) -> Option<f64> {
    match pricing?.get(key)? {
        Value::String(s) => normalize_price(Some(s)),
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(|v| v * TOKENS_PER_UNIT),
        _ => None,
    }
}
