use driftwatch_core::{Kpi, KpiStatus};
use serde_json::Value;

use super::{records, scalar_string};
use crate::endpoint::KpiRules;
use crate::error::DriftError;

const MISSING_FIELDS: &str = "Missing required KPI fields";

/// Normalize a KPI payload (`[...]` or `{"<container>": [...]}`).
pub fn normalize_kpis(
    value: &Value,
    container: Option<&str>,
    rules: &KpiRules,
) -> Result<Vec<Kpi>, DriftError> {
    records(value, container, rules.lenient_container)?
        .iter()
        .map(|item| normalize_kpi(item, rules))
        .collect()
}

fn normalize_kpi(item: &Value, rules: &KpiRules) -> Result<Kpi, DriftError> {
    let Some(map) = item.as_object() else {
        tracing::error!(kpi = %item, "Invalid KPI format");
        return Err(DriftError::Field(MISSING_FIELDS.to_string()));
    };

    let row_key = map
        .get("rowKey")
        .and_then(scalar_string)
        .filter(|k| !k.is_empty());
    let value = match map.get("value") {
        None | Some(Value::Null) => None,
        Some(v) => Some(scalar_string(v).ok_or_else(|| {
            DriftError::Field(format!("KPI value must be a string or number, got {v}"))
        })?),
    };
    let value = value.filter(|v| !(rules.reject_empty_value && v.is_empty()));

    let (Some(row_key), Some(value)) = (row_key, value) else {
        tracing::error!(kpi = %item, "Invalid KPI format");
        return Err(DriftError::Field(MISSING_FIELDS.to_string()));
    };

    if rules.rekey_status_row && row_key == "status" {
        let status = KpiStatus::from(value.as_str());
        return Ok(Kpi::new("Status", value, status));
    }

    if !rules.pass_through {
        return Ok(Kpi::new(row_key, value, KpiStatus::Normal));
    }

    let status = map
        .get("status")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(KpiStatus::from)
        .unwrap_or_default();
    let optional = |key: &str| {
        map.get(key)
            .and_then(scalar_string)
            .filter(|s| !s.is_empty())
    };

    Ok(Kpi {
        row_key,
        value,
        status,
        business_unit: optional("businessUnit"),
        use_case: optional("useCase"),
        id: optional("id"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{EndpointDescriptor, MODE1_KPIS, MODE2_KPIS};
    use serde_json::json;

    fn rules(desc: &EndpointDescriptor) -> KpiRules {
        desc.kpi_rules
    }

    #[test]
    fn mode1_rekeys_status_row_and_drops_extras() {
        let payload = json!({"kpis": [
            {"id": "KPI-7XK2QA", "rowKey": "kstest", "value": "0.31", "status": "Warning"},
            {"id": "KPI-P3MZ9R", "rowKey": "status", "value": "Warning"},
        ]});
        let kpis = normalize_kpis(&payload, Some("kpis"), &rules(&MODE1_KPIS)).unwrap();
        assert_eq!(kpis[0], Kpi::new("kstest", "0.31", KpiStatus::Normal));
        assert_eq!(kpis[1], Kpi::new("Status", "Warning", KpiStatus::Warning));
    }

    #[test]
    fn status_row_is_not_rekeyed_elsewhere() {
        let payload = json!([{"rowKey": "status", "value": "Warning"}]);
        let kpis = normalize_kpis(&payload, Some("kpis"), &rules(&MODE2_KPIS)).unwrap();
        assert_eq!(kpis[0].row_key, "status");
        assert_eq!(kpis[0].status, KpiStatus::Normal);
    }

    #[test]
    fn pass_through_keeps_optional_fields() {
        let payload = json!([{
            "rowKey": "currentDrift1", "value": 0.42, "status": "Alert",
            "businessUnit": "CCS", "useCase": "CC-Di", "id": 17
        }]);
        let kpis = normalize_kpis(&payload, Some("kpis"), &rules(&MODE2_KPIS)).unwrap();
        let kpi = &kpis[0];
        assert_eq!(kpi.value, "0.42");
        assert_eq!(kpi.status, KpiStatus::Alert);
        assert_eq!(kpi.business_unit.as_deref(), Some("CCS"));
        assert_eq!(kpi.use_case.as_deref(), Some("CC-Di"));
        assert_eq!(kpi.id.as_deref(), Some("17"));
    }

    #[test]
    fn wrapper_and_bare_array_normalize_identically() {
        let items = json!([
            {"rowKey": "mseRef", "value": "0.14"},
            {"rowKey": "status", "value": "Normal"},
        ]);
        let wrapped = json!({ "kpis": items.clone() });
        for desc in [&MODE1_KPIS, &MODE2_KPIS] {
            let r = rules(desc);
            assert_eq!(
                normalize_kpis(&items, Some("kpis"), &r).unwrap(),
                normalize_kpis(&wrapped, Some("kpis"), &r).unwrap()
            );
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let payload = json!({"kpis": [{"rowKey": "wasserstein", "value": "1.2"}]});
        let r = rules(&MODE1_KPIS);
        let first = normalize_kpis(&payload, Some("kpis"), &r).unwrap();
        let second = normalize_kpis(&payload, Some("kpis"), &r).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_fields_are_field_errors() {
        let r = rules(&MODE2_KPIS);
        for bad in [
            json!([{"value": "1"}]),
            json!([{"rowKey": "", "value": "1"}]),
            json!([{"rowKey": "a"}]),
            json!([{"rowKey": "a", "value": null}]),
            json!(["kstest"]),
        ] {
            let err = normalize_kpis(&bad, Some("kpis"), &r).unwrap_err();
            assert!(
                matches!(err, DriftError::Field(ref m) if m == MISSING_FIELDS),
                "{bad}: {err:?}"
            );
        }
    }

    #[test]
    fn mode1_rejects_empty_values() {
        let payload = json!([{"rowKey": "alertKeeper", "value": ""}]);
        assert!(normalize_kpis(&payload, Some("kpis"), &rules(&MODE1_KPIS)).is_err());
        assert!(normalize_kpis(&payload, Some("kpis"), &rules(&MODE2_KPIS)).is_ok());
    }

    #[test]
    fn structured_values_are_rejected() {
        let payload = json!([{"rowKey": "hyperparameters", "value": {"ks": 0.1}}]);
        let err = normalize_kpis(&payload, Some("kpis"), &rules(&MODE2_KPIS)).unwrap_err();
        assert!(matches!(err, DriftError::Field(ref m) if m.contains("string or number")));
    }

    #[test]
    fn container_shape_is_checked_before_records() {
        let payload = json!({"kpis": "ABC123"});
        let err = normalize_kpis(&payload, Some("kpis"), &rules(&MODE1_KPIS)).unwrap_err();
        assert!(matches!(err, DriftError::Shape(_)));
    }
}
