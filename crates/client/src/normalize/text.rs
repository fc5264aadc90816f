use serde_json::Value;

use super::{records, type_name};
use crate::error::DriftError;

/// Explanation text from an XAI payload.
///
/// Accepts a bare JSON string, `{"text": "..."}` or `{"explanation": "..."}`.
/// The object fields must be non-empty; a bare string is taken as-is.
pub fn normalize_explanation(value: &Value) -> Result<String, DriftError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Object(map) => ["text", "explanation"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str).filter(|s| !s.is_empty()))
            .map(str::to_string)
            .ok_or_else(|| DriftError::Shape("invalid XAI response format".to_string())),
        other => Err(DriftError::Shape(format!(
            "invalid XAI response format: got {}",
            type_name(other)
        ))),
    }
}

/// A list of names, as a bare array or wrapped under `container`.
pub fn normalize_names(
    value: &Value,
    container: Option<&str>,
) -> Result<Vec<String>, DriftError> {
    records(value, container, false)?
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(name.clone()),
            other => Err(DriftError::Field(format!(
                "{} entries must be strings, got {}",
                container.unwrap_or("list"),
                type_name(other)
            ))),
        })
        .collect()
}
