//! Drift report assembled from the raw `/mode{n}/data` payload.
//!
//! Mode 2 reports use their own KPI layout and index plot points by position;
//! every other mode uses the mode-1 layout.

use std::collections::HashSet;

use driftwatch_core::{
    AllOutlets, ErrorDataState, Indices, Kpi, KpiStatus, Mode, MseTrendPoint,
    OutletsExceedingThreshold, PlotDataPoint, PlotX, RowStatus, StatusDistribution,
    TableDataPoint, Top10Id,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DriftError;
use crate::normalize::{scalar_string, type_name};

const NOT_AVAILABLE: &str = "N/A";
const UNKNOWN_STATE: &str = "Unknown";
const NO_EXPLANATION: &str = "No explanation available";
const TOP_IDS: usize = 10;
/// Rows within this fraction of the threshold count as warnings.
const WARNING_BAND: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub mode: Mode,
    pub kpis: Vec<Kpi>,
    pub errors: ErrorDataState,
    pub top10_ids: Vec<Top10Id>,
    pub outlets_exceeding_threshold: Vec<OutletsExceedingThreshold>,
    pub all_outlets: Vec<AllOutlets>,
    pub mse_trend: Vec<MseTrendPoint>,
    pub indices: Indices,
    pub status_distribution: StatusDistribution,
    pub state: String,
    pub drift_detected: bool,
    pub error_percentage_threshold: f64,
    pub current_period: String,
    pub reference_period: String,
    pub sorted_periods: Vec<String>,
    pub total_outlets: Option<String>,
    pub xai_explanation: String,
}

/// Build a `mode` report from the raw payload. Missing sections are empty or
/// `N/A`; only a non-object payload is rejected.
pub fn build_report(mode: Mode, raw: &Value) -> Result<DriftReport, DriftError> {
    let Some(raw) = raw.as_object() else {
        return Err(DriftError::Shape(format!(
            "Invalid drift data format: expected object, got {}",
            type_name(raw)
        )));
    };

    let threshold = number(raw, "error_percentage_threshold").unwrap_or(0.0);
    let drift_state = raw.get("drift_state").and_then(Value::as_object);
    let drift_detected = drift_state
        .and_then(|s| s.get("drift_detected"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let empty = Map::new();
    let metrics = drift_state
        .and_then(|s| s.get("metrics"))
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let sorted_periods: Vec<String> = array(raw, "sorted_periods")
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    let id_errors: Vec<IdError> = array(raw, "id_error")
        .iter()
        .map(IdError::from_value)
        .collect();
    let errors = id_error_state(mode, &id_errors, threshold);
    let status_distribution = status_distribution(&errors.table_data, threshold);

    let kpis = match mode {
        Mode::Mode2 => mode2_kpis(raw, metrics, drift_detected),
        _ => mode1_kpis(raw, metrics, drift_detected, threshold),
    };

    Ok(DriftReport {
        mode,
        kpis,
        top10_ids: top_ids(&id_errors),
        outlets_exceeding_threshold: array(raw, "outlets_exceeding_threshold")
            .iter()
            .filter_map(Value::as_object)
            .map(|item| OutletsExceedingThreshold {
                id: item.get("id").and_then(scalar_string).unwrap_or_default(),
                y_true: number(item, "y_true").unwrap_or(0.0),
                y_pred: number(item, "y_pred").unwrap_or(0.0),
                percentage_error: number(item, "percentage_error").unwrap_or(0.0),
            })
            .collect(),
        all_outlets: all_outlets(raw),
        mse_trend: mse_trend(raw),
        indices: indices(raw, &id_errors),
        errors,
        status_distribution,
        state: raw
            .get("state")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_STATE)
            .to_string(),
        drift_detected,
        error_percentage_threshold: threshold,
        current_period: raw
            .get("current_period")
            .and_then(Value::as_str)
            .unwrap_or(NOT_AVAILABLE)
            .to_string(),
        reference_period: sorted_periods
            .first()
            .cloned()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        sorted_periods,
        total_outlets: raw.get("total_outlets").and_then(scalar_string),
        xai_explanation: explanation(mode, raw),
    })
}

fn number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

fn array<'a>(map: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    map.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn fixed(value: Option<f64>, places: usize) -> String {
    match value {
        Some(v) => format!("{v:.places$}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn drift_status(drift_detected: bool) -> KpiStatus {
    if drift_detected {
        KpiStatus::Warning
    } else {
        KpiStatus::Normal
    }
}

fn drift_detected_kpi(drift_detected: bool) -> Kpi {
    Kpi::new(
        "Drift Detected",
        if drift_detected { "Yes" } else { "No" },
        if drift_detected {
            KpiStatus::Alert
        } else {
            KpiStatus::Normal
        },
    )
}

fn average_error_kpis(raw: &Map<String, Value>) -> [Kpi; 2] {
    [
        Kpi::new(
            "Average Percentage Error (All)",
            fixed(number(raw, "average_percentage_error_all"), 2),
            KpiStatus::Normal,
        ),
        Kpi::new(
            "Average Percentage Error (Exceeding)",
            fixed(number(raw, "average_percentage_error_exceeding"), 2),
            KpiStatus::Alert,
        ),
    ]
}

fn mode1_kpis(
    raw: &Map<String, Value>,
    metrics: &Map<String, Value>,
    drift_detected: bool,
    threshold: f64,
) -> Vec<Kpi> {
    let status = drift_status(drift_detected);
    let count = |key: &str| {
        raw.get(key)
            .and_then(scalar_string)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };
    let metric = |key: &str| fixed(number(metrics, key), 3);

    let mut kpis = vec![
        Kpi::new("Ref MSE", metric("mean_mse_reference"), KpiStatus::Normal),
        Kpi::new("Curr MSE", metric("mean_mse_current"), status.clone()),
        drift_detected_kpi(drift_detected),
        Kpi::new(
            "Error Percentage Threshold",
            format!("{threshold:.2}"),
            KpiStatus::Normal,
        ),
        Kpi::new("Total Outlets", count("total_outlets"), KpiStatus::Normal),
        Kpi::new(
            "Exceeding Count",
            count("outlets_exceeding_threshold_count"),
            KpiStatus::Alert,
        ),
    ];
    kpis.extend(average_error_kpis(raw));
    kpis.extend([
        Kpi::new("KS Statistic", metric("ks_statistic"), KpiStatus::Normal),
        Kpi::new("KS p-value", metric("ks_p_value"), KpiStatus::Normal),
        Kpi::new("Wasserstein", metric("wasserstein_distance"), KpiStatus::Normal),
        Kpi::new("Status", status.as_str(), status.clone()),
    ]);
    kpis
}

fn mode2_kpis(
    raw: &Map<String, Value>,
    metrics: &Map<String, Value>,
    drift_detected: bool,
) -> Vec<Kpi> {
    let status = drift_status(drift_detected);
    let metric = |key: &str| fixed(number(metrics, key), 3);
    let threshold = raw
        .get("error_percentage_threshold")
        .filter(|v| v.is_number())
        .and_then(scalar_string)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let mut kpis = vec![
        drift_detected_kpi(drift_detected),
        Kpi::new("Error Percentage Threshold", threshold, KpiStatus::Normal),
    ];
    kpis.extend(average_error_kpis(raw));
    kpis.extend([
        Kpi::new("kstest", metric("ks_statistic"), KpiStatus::Normal),
        Kpi::new("wasserstein", metric("wasserstein_distance"), KpiStatus::Normal),
        Kpi::new("mseRef", metric("mean_mse_reference"), KpiStatus::Normal),
        Kpi::new("mseCurrent", metric("mean_mse_current"), KpiStatus::Normal),
        Kpi::new("status", status.as_str(), status.clone()),
    ]);
    kpis
}

/// One `id_error` row.
struct IdError {
    id: String,
    time_period: String,
    error: f64,
}

impl IdError {
    fn from_value(value: &Value) -> Self {
        let map = value.as_object();
        let field = |key: &str| map.and_then(|m| m.get(key));
        Self {
            id: field("id").and_then(scalar_string).unwrap_or_default(),
            time_period: field("time_period")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            error: field("Mean_Prediction_Error")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        }
    }
}

fn id_error_state(mode: Mode, rows: &[IdError], threshold: f64) -> ErrorDataState {
    let mut state = ErrorDataState::default();
    for (idx, row) in rows.iter().enumerate() {
        let exceeds_threshold = row.error.abs() > threshold;
        let x = match mode {
            Mode::Mode2 => PlotX::Number(idx as f64),
            _ => PlotX::Text(row.time_period.clone()),
        };
        state.plot_data.push(PlotDataPoint {
            x,
            y: row.error,
            exceeds_threshold,
        });
        state.table_data.push(TableDataPoint {
            id: row.id.clone(),
            time_period: row.time_period.clone(),
            mean_prediction: row.error,
            error: row.error,
            percentage_error: row.error.abs(),
            status: RowStatus::from_exceeds(exceeds_threshold),
        });
    }
    state
}

/// Ids with the largest absolute error, largest first. Ties keep input order.
fn top_ids(rows: &[IdError]) -> Vec<Top10Id> {
    let mut ranked: Vec<&IdError> = rows.iter().collect();
    ranked.sort_by(|a, b| b.error.abs().total_cmp(&a.error.abs()));
    ranked
        .into_iter()
        .take(TOP_IDS)
        .map(|row| Top10Id {
            id: row.id.clone(),
            time_period: row.time_period.clone(),
            mean_prediction_error: row.error,
        })
        .collect()
}

fn all_outlets(raw: &Map<String, Value>) -> Vec<AllOutlets> {
    array(raw, "all_outlets")
        .iter()
        .filter_map(Value::as_object)
        .map(|item| AllOutlets {
            id: item
                .get("id")
                .and_then(|id| id.as_i64().or_else(|| id.as_str()?.trim().parse().ok()))
                .unwrap_or(0),
            y_true: number(item, "y_true").unwrap_or(0.0),
            y_pred: number(item, "y_pred").unwrap_or(0.0),
            percentage_error: number(item, "percentage_error").unwrap_or(0.0),
        })
        .collect()
}

fn mse_trend(raw: &Map<String, Value>) -> Vec<MseTrendPoint> {
    array(raw, "mse_trend")
        .iter()
        .filter_map(Value::as_object)
        .map(|item| MseTrendPoint {
            mape: number(item, "MAPE").unwrap_or(0.0),
            time_period: item
                .get("time_period")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}

/// `indices` as sent, or derived from `clusters`: each `id_error` position
/// goes to `warning` or `drift` when its id is listed there, else `normal`.
fn indices(raw: &Map<String, Value>, rows: &[IdError]) -> Indices {
    if let Some(sent) = raw
        .get("indices")
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value::<Indices>(v.clone()).ok())
    {
        return sent;
    }

    let clusters = raw.get("clusters");
    let members = |name: &str| -> HashSet<String> {
        clusters
            .and_then(|c| c.get(name))
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(scalar_string).collect())
            .unwrap_or_default()
    };
    let (warning, drift) = (members("warning"), members("drift"));

    let mut indices = Indices::default();
    for (idx, row) in rows.iter().enumerate() {
        if warning.contains(&row.id) {
            indices.warning.push(idx);
        } else if drift.contains(&row.id) {
            indices.drift.push(idx);
        } else {
            indices.normal.push(idx);
        }
    }
    indices
}

/// Percent of rows in each band, by largest remainder so the three always
/// sum to 100. Ties go to the earlier band.
fn status_distribution(rows: &[TableDataPoint], threshold: f64) -> StatusDistribution {
    // An empty table shows as all good rather than all error.
    if rows.is_empty() {
        return StatusDistribution {
            good: 100,
            warning: 0,
            error: 0,
        };
    }

    let warning_threshold = threshold * WARNING_BAND;
    let mut counts = [0u32; 3];
    for row in rows {
        let value = row.percentage_error.abs();
        let band = if value >= threshold {
            2
        } else if value >= warning_threshold {
            1
        } else {
            0
        };
        counts[band] += 1;
    }

    let total = counts.iter().sum::<u32>();
    let mut shares = counts.map(|n| n * 100 / total);
    let remainders = counts.map(|n| n * 100 % total);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]));
    let missing = 100 - shares.iter().sum::<u32>();
    for &band in order.iter().take(missing as usize) {
        shares[band] += 1;
    }

    let [good, warning, error] = shares;
    StatusDistribution {
        good,
        warning,
        error,
    }
}

fn explanation(mode: Mode, raw: &Map<String, Value>) -> String {
    let xai = || {
        raw.get("xai")
            .and_then(|x| x.get("explanation"))
            .and_then(Value::as_str)
    };
    let text = match mode {
        Mode::Mode2 => xai()
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_EXPLANATION),
        _ => raw
            .get("explanation")
            .and_then(Value::as_str)
            .or_else(xai)
            .unwrap_or_default(),
    };
    text.to_string()
}
