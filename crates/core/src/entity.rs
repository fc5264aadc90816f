use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── Modes ─────────────────────────────────────────────────────

/// Dashboard mode. Each mode is a separate drift monitoring setup on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Mode1,
    Mode2,
    Mode3,
    Mode4,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Mode1, Mode::Mode2, Mode::Mode3, Mode::Mode4];

    /// Numeric form used in backend paths (`/metrics/1`).
    pub fn number(self) -> u8 {
        match self {
            Mode::Mode1 => 1,
            Mode::Mode2 => 2,
            Mode::Mode3 => 3,
            Mode::Mode4 => 4,
        }
    }

    /// Key used by the mode-selection data (`"mode1"`).
    pub fn key(self) -> &'static str {
        match self {
            Mode::Mode1 => "mode1",
            Mode::Mode2 => "mode2",
            Mode::Mode3 => "mode3",
            Mode::Mode4 => "mode4",
        }
    }

    /// Human label shown next to a use case.
    pub fn type_label(self) -> &'static str {
        match self {
            Mode::Mode1 => "OCTAVE RGCD",
            Mode::Mode2 => "Other RG",
            Mode::Mode3 => "OCTAVE CLCD",
            Mode::Mode4 => "Other CL",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Mode {
    type Err = CoreError;

    /// Accepts `"1"`, `"mode1"` and `"Mode1"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("mode")
            .or_else(|| trimmed.strip_prefix("Mode"))
            .unwrap_or(trimmed);
        match digits {
            "1" => Ok(Mode::Mode1),
            "2" => Ok(Mode::Mode2),
            "3" => Ok(Mode::Mode3),
            "4" => Ok(Mode::Mode4),
            _ => Err(CoreError::UnknownMode(s.to_string())),
        }
    }
}

// ── KPIs ──────────────────────────────────────────────────────

/// Status attached to a KPI row.
///
/// The backend is loose about this field, so anything outside the four
/// known values is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KpiStatus {
    #[default]
    Normal,
    Warning,
    Error,
    Alert,
    Other(String),
}

impl KpiStatus {
    pub fn as_str(&self) -> &str {
        match self {
            KpiStatus::Normal => "Normal",
            KpiStatus::Warning => "Warning",
            KpiStatus::Error => "Error",
            KpiStatus::Alert => "Alert",
            KpiStatus::Other(s) => s,
        }
    }
}

impl From<&str> for KpiStatus {
    fn from(s: &str) -> Self {
        match s {
            "Normal" => KpiStatus::Normal,
            "Warning" => KpiStatus::Warning,
            "Error" => KpiStatus::Error,
            "Alert" => KpiStatus::Alert,
            other => KpiStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for KpiStatus {
    fn from(s: String) -> Self {
        KpiStatus::from(s.as_str())
    }
}

impl From<KpiStatus> for String {
    fn from(status: KpiStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for KpiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named metric value with a status, as rendered in the KPI tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    /// Unique within one fetch, not globally.
    pub row_key: String,
    pub value: String,
    #[serde(default)]
    pub status: KpiStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Kpi {
    pub fn new(row_key: impl Into<String>, value: impl Into<String>, status: KpiStatus) -> Self {
        Self {
            row_key: row_key.into(),
            value: value.into(),
            status,
            business_unit: None,
            use_case: None,
            id: None,
        }
    }
}

// ── Error data ────────────────────────────────────────────────

/// X coordinate of a plot point: a timestamp string or an ordinal index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlotX {
    Text(String),
    Number(f64),
}

impl From<String> for PlotX {
    fn from(s: String) -> Self {
        PlotX::Text(s)
    }
}

impl From<f64> for PlotX {
    fn from(n: f64) -> Self {
        PlotX::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotDataPoint {
    pub x: PlotX,
    pub y: f64,
    pub exceeds_threshold: bool,
}

/// Status of an error table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RowStatus {
    #[default]
    Normal,
    Alert,
}

impl RowStatus {
    pub fn from_exceeds(exceeds_threshold: bool) -> Self {
        if exceeds_threshold {
            RowStatus::Alert
        } else {
            RowStatus::Normal
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowStatus::Normal => write!(f, "Normal"),
            RowStatus::Alert => write!(f, "Alert"),
        }
    }
}

impl FromStr for RowStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(RowStatus::Normal),
            "Alert" => Ok(RowStatus::Alert),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDataPoint {
    pub id: String,
    pub time_period: String,
    pub mean_prediction: f64,
    pub error: f64,
    pub percentage_error: f64,
    pub status: RowStatus,
}

/// Plot and table views of one error payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDataState {
    pub plot_data: Vec<PlotDataPoint>,
    pub table_data: Vec<TableDataPoint>,
}

impl ErrorDataState {
    pub fn is_empty(&self) -> bool {
        self.plot_data.is_empty() && self.table_data.is_empty()
    }
}

/// An outlet whose prediction error breached the threshold. Presence in a
/// list is the breach; there is no separate flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletsExceedingThreshold {
    pub id: String,
    pub y_true: f64,
    pub y_pred: f64,
    pub percentage_error: f64,
}

/// One of the ten ids with the largest absolute prediction error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Top10Id {
    pub id: String,
    pub time_period: String,
    #[serde(rename = "Mean_Prediction_Error")]
    pub mean_prediction_error: f64,
}

/// Share of rows per status bucket, in whole percent. Always sums to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusDistribution {
    pub good: u32,
    pub warning: u32,
    pub error: u32,
}

/// Prediction for one outlet, whether or not it breached the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllOutlets {
    pub id: i64,
    pub y_true: f64,
    pub y_pred: f64,
    pub percentage_error: f64,
}

/// Mean absolute percentage error of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MseTrendPoint {
    #[serde(rename = "MAPE")]
    pub mape: f64,
    pub time_period: String,
}

/// Positions in `id_error` grouped by cluster.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Indices {
    #[serde(default)]
    pub normal: Vec<usize>,
    #[serde(default)]
    pub warning: Vec<usize>,
    #[serde(default)]
    pub drift: Vec<usize>,
}

// ── Mode selection ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeSelectionEntry {
    pub user: String,
    pub business_unit: String,
    pub use_case: String,
    pub mode: String,
    #[serde(default)]
    pub alert_keeper: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUseCase {
    pub business_unit: String,
    /// `"{businessUnit}-{useCase}"`.
    pub name: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub mode_type: String,
    pub alert_keeper: String,
}

impl From<&ModeSelectionEntry> for UserUseCase {
    fn from(entry: &ModeSelectionEntry) -> Self {
        let mode_type = entry
            .mode
            .parse::<Mode>()
            .map(|m| m.type_label())
            .unwrap_or("Default");
        Self {
            business_unit: entry.business_unit.clone(),
            name: format!("{}-{}", entry.business_unit, entry.use_case),
            mode: entry.mode.clone(),
            mode_type: mode_type.to_string(),
            alert_keeper: entry.alert_keeper.clone(),
        }
    }
}
