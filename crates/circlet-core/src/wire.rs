//! Serde helpers for the remote JSON schema.
//!
//! The remote service is inconsistent about scalars: the same field arrives as
//! `"40.71"` in one response and `40.71` in another. Values are kept as the
//! string the service sent, with numbers and booleans stringified.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if b { "1" } else { "0" }.to_string()),
        other => Some(other.to_string()),
    }
}

/// Deserializes an optional scalar into `Option<String>`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_string))
}

/// Deserializes a required scalar into `String`; `null` becomes empty.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value).unwrap_or_default())
}

/// Deserializes an optional integer sent as a number or a numeric string.
/// `null`, a missing field and a blank string all become `None`.
pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("integer out of range")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(|f| Some(f as i64))
            .map_err(|_| serde::de::Error::custom(format!("invalid integer '{s}'"))),
        Some(other) => Err(serde::de::Error::custom(format!("invalid integer {other}"))),
    }
}

/// Deserializes a timestamp sent either as seconds or as a numeric string.
pub fn timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| f as i64)
            .map_err(|_| serde::de::Error::custom(format!("invalid timestamp '{s}'"))),
        Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!(
            "invalid timestamp {other}"
        ))),
    }
}
