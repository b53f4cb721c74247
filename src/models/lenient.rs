//! Field deserializers for loosely-typed JSON coming from the remote store
//! and hand-edited promotion files. A field of the wrong type degrades to a
//! default instead of failing the whole record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Strings pass through, numbers and booleans become their text form,
/// anything else (null, arrays, objects) becomes empty.
pub fn string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Daily view cap. Fractions round up, since a count reaches `2.5` only at 3.
/// Zero or negative caps hold at zero. Non-numeric values mean no cap.
pub fn view_limit<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).map(|n| n.ceil().clamp(0.0, u32::MAX as f64) as u32))
}

/// Sort priority. Numeric strings are accepted, fractions are rounded and
/// anything non-numeric is treated as missing.
pub fn priority<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).map(|n| n.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64))
}

/// `true`, non-zero numbers and the strings `"true"`, `"yes"`, `"1"` are set;
/// everything else is unset.
pub fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    })
}
