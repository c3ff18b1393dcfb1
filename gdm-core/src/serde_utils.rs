//! Serialization helpers and lenient deserializers for stored configuration.
//!
//! Stored rule data is written by admin forms and hand-edited files, so a
//! bound may arrive as `"12.5"`, a list as a single id, or a flag as `"yes"`.
//! The `lenient_*` functions accept all of these and coerce anything they
//! cannot understand to the type's zero value instead of failing the whole
//! document.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::errors::{GdmError, Result};

/// Serializes a value to pretty JSON with canonical error handling.
pub fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|err| GdmError::SerializationError(err.to_string()))
}

/// Serializes a value to YAML.
pub fn to_yaml<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).map_err(|err| GdmError::SerializationError(err.to_string()))
}

/// Deserializes a JSON string into the provided type with shared error semantics.
pub fn from_json_str<T: serde::de::DeserializeOwned>(input: &str) -> Result<T> {
    serde_json::from_str(input).map_err(|err| GdmError::DeserializationError(err.to_string()))
}

/// Coerces a loose JSON value into a float. Unparsable input yields `0.0`.
pub fn coerce_f64(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(raw) => {
            let trimmed = raw.trim().replace(',', ".");
            if trimmed.is_empty() {
                return 0.0;
            }
            trimmed.parse::<f64>().unwrap_or_else(|_| {
                warn!(value = %raw, "non-numeric value coerced to 0");
                0.0
            })
        }
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Coerces a loose JSON value into a boolean flag.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "si" | "sí" | "on"
        ),
        _ => false,
    }
}

/// Coerces a loose JSON value into a list of numeric ids.
///
/// Accepts arrays of numbers or numeric strings, a single number, or a
/// comma separated string. Entries that are not positive integers are dropped.
pub fn coerce_ids(value: &Value) -> Vec<u64> {
    let mut ids = match value {
        Value::Array(items) => items.iter().filter_map(coerce_id).collect(),
        Value::String(raw) => raw
            .split(',')
            .filter_map(|part| part.trim().parse::<u64>().ok())
            .collect(),
        Value::Number(_) => coerce_id(value).into_iter().collect(),
        Value::Null => Vec::new(),
        other => {
            warn!(value = %other, "non-list id configuration coerced to empty list");
            Vec::new()
        }
    };
    ids.retain(|id| *id > 0);
    ids
}

fn coerce_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64)),
        Value::String(raw) => raw.trim().parse::<u64>().ok(),
        _ => None,
    }
}

pub fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value))
}

pub fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_bool(&value))
}

pub fn lenient_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_ids(&value))
}

pub fn lenient_i32<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = coerce_f64(&value);
    Ok(number.clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}
