//! Synthetic sample data shown when the backend has nothing usable.
//!
//! Only the shape is fixed: row keys, record counts, id scheme and value
//! ranges. Values come from the caller's RNG so tests can seed it.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use driftwatch_core::{
    ErrorDataState, Kpi, KpiStatus, PlotDataPoint, PlotX, RowStatus, TableDataPoint,
};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::normalize::derived_percentage_error;

/// Business units used for mock KPIs, with their first use case.
pub const MOCK_BUSINESS_UNITS: &[(&str, &str)] = &[("CCS", "CC-Di"), ("JMSL", "JM-Ch")];

pub const SAMPLE_ERROR_COUNT: usize = 10;
pub const SAMPLE_ERROR_ID_PREFIX: &str = "MISSING_BACKEND_ID_";

/// Timestamp in the `2026-10-16T09:00:00.000Z` form the dashboard expects.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Eight mode-2 KPIs for one randomly chosen business unit.
pub fn mock_kpis<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Vec<Kpi> {
    let (unit, use_case) = *MOCK_BUSINESS_UNITS
        .choose(rng)
        .unwrap_or(&MOCK_BUSINESS_UNITS[0]);

    let alert_time = now - Duration::milliseconds(rng.gen_range(0..48 * 60 * 60 * 1000));
    let overall = drift_status(rng, 0.3);

    let rows = [
        ("alertTime", timestamp(alert_time), KpiStatus::Normal),
        ("runtimeCount", rng.gen_range(0..300).to_string(), KpiStatus::Normal),
        ("alertKeeper", format!("{unit} Admin"), KpiStatus::Normal),
        ("currentDrift1", format!("{:.2}", rng.gen::<f64>()), drift_status(rng, 0.2)),
        ("currentDrift2", format!("{:.2}", rng.gen::<f64>()), drift_status(rng, 0.2)),
        ("status", overall.as_str().to_string(), overall),
        ("businessUnit", unit.to_string(), KpiStatus::Normal),
        ("useCase", use_case.to_string(), KpiStatus::Normal),
    ];

    rows.into_iter()
        .map(|(row_key, value, status)| Kpi {
            business_unit: Some(unit.to_string()),
            use_case: Some(use_case.to_string()),
            ..Kpi::new(row_key, value, status)
        })
        .collect()
}

fn drift_status<R: Rng + ?Sized>(rng: &mut R, warning_probability: f64) -> KpiStatus {
    if rng.gen_bool(warning_probability) {
        KpiStatus::Warning
    } else {
        KpiStatus::Normal
    }
}

/// Ten error records, one per day going back from `now`, as both plot points
/// and table rows.
pub fn sample_errors<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> ErrorDataState {
    let mut state = ErrorDataState::default();

    for i in 0..SAMPLE_ERROR_COUNT {
        let time_period = timestamp(now - Duration::days(i as i64));
        let mean_prediction = rng.gen_range(0.0..100.0);
        let error = rng.gen_range(0.0..20.0);
        let exceeds_threshold = rng.gen_bool(0.3);

        state.plot_data.push(PlotDataPoint {
            x: PlotX::Text(time_period.clone()),
            y: error,
            exceeds_threshold,
        });
        state.table_data.push(TableDataPoint {
            id: format!("{SAMPLE_ERROR_ID_PREFIX}{i}"),
            time_period,
            mean_prediction,
            error,
            percentage_error: derived_percentage_error(error, mean_prediction),
            status: RowStatus::from_exceeds(exceeds_threshold),
        });
    }

    state
}
