//! Turning raw response text into JSON.
//!
//! [`parse_strict`] is a plain parse. [`parse_tolerant`] additionally insists
//! on a `{`/`[` prefix and, when the direct parse fails, recovers the first
//! balanced JSON object or array embedded in the text.

use serde_json::Value;

use crate::error::DriftError;

/// Parse a body as JSON, any top-level value allowed.
pub fn parse_strict(text: &str) -> Result<Value, DriftError> {
    serde_json::from_str(text.trim()).map_err(|e| DriftError::Parse(e.to_string()))
}

/// Parse a body that must be a JSON object or array, tolerating text after
/// the closing bracket.
pub fn parse_tolerant(text: &str) -> Result<Value, DriftError> {
    let cleaned = text.trim();
    if !(cleaned.starts_with('{') || cleaned.starts_with('[')) {
        return Err(DriftError::Format(format!("{}...", preview(cleaned, 20))));
    }

    match serde_json::from_str(cleaned) {
        Ok(value) => Ok(value),
        Err(direct) => {
            tracing::debug!(error = %direct, "direct JSON parse failed, scanning for embedded JSON");
            let embedded = extract_embedded_json(cleaned)
                .ok_or_else(|| DriftError::Parse("No JSON found in response".to_string()))?;
            serde_json::from_str(embedded).map_err(|e| DriftError::Parse(e.to_string()))
        }
    }
}

/// First balanced `{...}` or `[...]` in `text`.
///
/// Brackets inside string literals are ignored, and a backslash escapes the
/// next character inside a string. Returns `None` when no opening bracket
/// exists or it is never closed.
pub fn extract_embedded_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if in_string {
            match ch {
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// At most `max` characters of `text`, cut on a char boundary.
pub(crate) fn preview(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
