use driftwatch_core::{ErrorDataState, PlotDataPoint, PlotX, RowStatus, TableDataPoint};
use serde_json::{Map, Value};

use super::{number_field, scalar_string, string_field, truthy, type_name};
use crate::error::DriftError;

// Upstream spellings seen for each field, preferred first.
const TIME_PERIOD: &[&str] = &["timePeriod", "time_period"];
const MEAN_PREDICTION: &[&str] = &["meanPrediction", "meanPred"];
const ERROR: &[&str] = &["error", "err"];
const PERCENTAGE_ERROR: &[&str] = &["percentageError", "percentage_error"];

/// Normalize an error payload.
///
/// A bare array is table data with no plot points. An object contributes its
/// `plotData` and `tableData` arrays (either may be absent). `now` fills in
/// missing time periods.
pub fn normalize_errors(value: &Value, now: &str) -> Result<ErrorDataState, DriftError> {
    let (plot, table): (&[Value], &[Value]) = match value {
        Value::Array(items) => (&[], items),
        Value::Object(map) => (array_field(map, "plotData")?, array_field(map, "tableData")?),
        other => {
            return Err(DriftError::Shape(format!(
                "Invalid errors response format: expected array or object, got {}",
                type_name(other)
            )))
        }
    };

    let plot_data = plot
        .iter()
        .map(|item| record(item).map(|map| plot_point(map, now)))
        .collect::<Result<Vec<_>, _>>()?;
    let table_data = table
        .iter()
        .map(|item| record(item).map(|map| table_row(map, now)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ErrorDataState { plot_data, table_data })
}

fn array_field<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a [Value], DriftError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(DriftError::Shape(format!(
            "Invalid {key} format: expected array, got {}",
            type_name(other)
        ))),
    }
}

fn record(item: &Value) -> Result<&Map<String, Value>, DriftError> {
    item.as_object().ok_or_else(|| {
        DriftError::Field(format!("error record must be an object, got {}", type_name(item)))
    })
}

fn plot_point(map: &Map<String, Value>, now: &str) -> PlotDataPoint {
    let x = match string_field(map, TIME_PERIOD) {
        Some(period) => PlotX::Text(period.to_string()),
        None => match map.get("x") {
            Some(Value::Number(n)) => PlotX::Number(n.as_f64().unwrap_or_default()),
            Some(Value::String(s)) if !s.is_empty() => PlotX::Text(s.clone()),
            _ => PlotX::Text(now.to_string()),
        },
    };
    let y = number_field(map, ERROR)
        .or_else(|| number_field(map, &["y"]))
        .unwrap_or(0.0);

    PlotDataPoint {
        x,
        y,
        exceeds_threshold: truthy(map.get("exceedsThreshold")),
    }
}

fn table_row(map: &Map<String, Value>, now: &str) -> TableDataPoint {
    let mean_prediction = number_field(map, MEAN_PREDICTION).unwrap_or(0.0);
    let error = number_field(map, ERROR).unwrap_or(0.0);
    let percentage_error = number_field(map, PERCENTAGE_ERROR)
        .unwrap_or_else(|| derived_percentage_error(error, mean_prediction));

    TableDataPoint {
        id: map.get("id").and_then(scalar_string).unwrap_or_default(),
        time_period: string_field(map, TIME_PERIOD).unwrap_or(now).to_string(),
        mean_prediction,
        error,
        percentage_error,
        status: RowStatus::from_exceeds(truthy(map.get("exceedsThreshold"))),
    }
}

/// `error / meanPrediction * 100`, or 0 when the mean is 0.
pub(crate) fn derived_percentage_error(error: f64, mean_prediction: f64) -> f64 {
    if mean_prediction != 0.0 {
        error / mean_prediction * 100.0
    } else {
        0.0
    }
}
