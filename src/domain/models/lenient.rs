//! Lenient coercion of loosely-typed JSON values.
//!
//! Persisted documents and request bodies are hand-edited or produced by
//! older clients, so numeric fields may arrive as floats, strings or
//! booleans. Everything funnels through [`coerce_int`].

use serde_json::Value;

/// Coerce a JSON value into an integer the way a forgiving form handler would.
///
/// - integers pass through (large unsigned values saturate)
/// - finite floats truncate toward zero
/// - booleans map to 0 / 1
/// - strings are trimmed and parsed as base-10 integers
///
/// Anything else yields `None`.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else if n.as_u64().is_some() {
                Some(i64::MAX)
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)
            }
        }
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
