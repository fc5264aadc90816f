//! Response-shape normalizers.
//!
//! Each normalizer takes parsed JSON and produces canonical records. The
//! container check always runs before any record is looked at, so a payload
//! with the wrong shape is reported as [`DriftError::Shape`], never as a
//! field error.

mod errors;
mod kpi;
mod text;

pub(crate) use errors::derived_percentage_error;
pub use errors::normalize_errors;
pub use kpi::normalize_kpis;
pub use text::{normalize_explanation, normalize_names};

use serde_json::{Map, Value};

use crate::error::DriftError;

/// Records of a response that is either a bare array or an object carrying
/// the array under `container`. Without a container only a bare array is
/// accepted.
///
/// With `lenient`, anything that has no such array yields an empty slice.
pub(crate) fn records<'a>(
    value: &'a Value,
    container: Option<&str>,
    lenient: bool,
) -> Result<&'a [Value], DriftError> {
    let wrapped = match value {
        Value::Array(items) => return Ok(items),
        Value::Object(map) => container.map(|name| (name, map.get(name))),
        _ => None,
    };

    match wrapped {
        Some((_, Some(Value::Array(items)))) => Ok(items),
        _ if lenient => Ok(&[]),
        Some((name, Some(other))) => Err(DriftError::Shape(format!(
            "Invalid {name} array format: expected array, got {}",
            type_name(other)
        ))),
        Some((name, None)) => Err(DriftError::Shape(format!(
            "Invalid response format - missing {name} array"
        ))),
        None => Err(DriftError::Shape(format!(
            "Invalid response format: expected array{}, got {}",
            if container.is_some() { " or object" } else { "" },
            type_name(value)
        ))),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Scalar rendered as a string: strings verbatim, numbers and booleans in
/// their JSON spelling. `None` for null, arrays and objects.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First numeric field among `keys`.
pub(crate) fn number_field(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| map.get(*k).and_then(Value::as_f64))
}

/// First non-empty string field among `keys`.
pub(crate) fn string_field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
}

/// JavaScript-style truthiness, as the backend's boolean flags arrive as
/// `true`, `1`, `"yes"` or omitted.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_accepts_array_and_wrapper() {
        let bare = json!([{"rowKey": "a"}]);
        let wrapped = json!({"kpis": [{"rowKey": "a"}]});
        assert_eq!(records(&bare, Some("kpis"), false).unwrap().len(), 1);
        assert_eq!(
            records(&wrapped, Some("kpis"), false).unwrap(),
            records(&bare, Some("kpis"), false).unwrap()
        );
    }

    #[test]
    fn records_reports_shape_errors() {
        let missing = json!({"status": "success"});
        let not_array = json!({"kpis": {"rowKey": "a"}});
        let scalar = json!("ABC");
        assert!(matches!(
            records(&missing, Some("kpis"), false),
            Err(DriftError::Shape(m)) if m.contains("missing kpis")
        ));
        assert!(matches!(records(&not_array, Some("kpis"), false), Err(DriftError::Shape(_))));
        assert!(matches!(records(&scalar, Some("kpis"), false), Err(DriftError::Shape(_))));
    }

    #[test]
    fn records_without_container_need_a_bare_array() {
        assert_eq!(records(&json!(["a"]), None, false).unwrap().len(), 1);
        assert!(matches!(
            records(&json!({"kpis": []}), None, false),
            Err(DriftError::Shape(m)) if m.contains("expected array, got object")
        ));
    }

    #[test]
    fn lenient_records_treat_odd_shapes_as_empty() {
        assert!(records(&json!({"status": "ok"}), Some("kpis"), true).unwrap().is_empty());
        assert!(records(&json!(42), Some("kpis"), true).unwrap().is_empty());
    }

    #[test]
    fn truthiness_matches_loose_flags() {
        assert!(truthy(Some(&json!(true))));
        assert!(truthy(Some(&json!(1))));
        assert!(truthy(Some(&json!("yes"))));
        assert!(!truthy(None));
        assert!(!truthy(Some(&json!(null))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(""))));
        assert!(!truthy(Some(&json!(false))));
    }

    #[test]
    fn scalar_string_renders_numbers() {
        assert_eq!(scalar_string(&json!(0.42)), Some("0.42".to_string()));
        assert_eq!(scalar_string(&json!(120)), Some("120".to_string()));
        assert_eq!(scalar_string(&json!(null)), None);
        assert_eq!(scalar_string(&json!([1])), None);
    }
}
