//! Endpoint descriptors.
//!
//! Every backend call is described by an [`EndpointDescriptor`]: where it
//! lives, which container field wraps its records, how the body is turned
//! into JSON, how KPI records are validated, and what to do when the backend
//! has nothing usable. The fetch pipeline in [`crate::client`] is the same for all
//! of them; only the descriptor differs.

use driftwatch_core::Mode;
use url::Url;

use crate::error::DriftError;

/// How the raw body is turned into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyGuard {
    /// Plain JSON parse; any top-level value.
    Plain,
    /// Sentinel-code detection (retried), then tolerant object/array parse.
    Sentinel,
}

/// Rules applied to each KPI record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KpiRules {
    /// Re-key a `status` row as `Status`, using its value as the status.
    pub rekey_status_row: bool,
    /// Keep upstream `status`, `businessUnit`, `useCase` and `id`.
    pub pass_through: bool,
    /// Treat an empty-string value as missing.
    pub reject_empty_value: bool,
    /// A payload without the container field is an empty list rather than a
    /// shape error.
    pub lenient_container: bool,
}

/// What a page wants when the backend has nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Return the error; the page keeps its state and shows a banner.
    Surface,
    /// Substitute synthetic sample data of the same shape.
    Synthetic,
}

/// Failures that let [`FallbackPolicy::Synthetic`] kick in. An empty answer
/// always does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackTrigger {
    /// Only a non-2xx status (after retries).
    Status,
    /// Any failure, including malformed bodies.
    AnyFailure,
}

impl FallbackTrigger {
    pub fn covers(self, err: &DriftError) -> bool {
        match self {
            FallbackTrigger::Status => err.status().is_some(),
            FallbackTrigger::AnyFailure => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Name used in logs.
    pub name: &'static str,
    /// Noun used in the user-facing error message.
    pub what: &'static str,
    /// Path template relative to the base URL. `{mode}` is replaced by the
    /// mode number.
    pub path: &'static str,
    /// Path template when a business unit is given; `{businessUnit}` is
    /// replaced by the percent-encoded unit name.
    pub scoped_path: Option<&'static str>,
    /// Field wrapping the record array in object-shaped responses. `None`
    /// accepts only a bare array.
    pub container: Option<&'static str>,
    pub guard: BodyGuard,
    /// Applied to each record of a KPI endpoint.
    pub kpi_rules: KpiRules,
    pub fallback: FallbackPolicy,
    pub fallback_on: FallbackTrigger,
}

impl EndpointDescriptor {
    const fn surface(name: &'static str, what: &'static str, path: &'static str) -> Self {
        Self {
            name,
            what,
            path,
            scoped_path: None,
            container: None,
            guard: BodyGuard::Plain,
            kpi_rules: PLAIN_RULES,
            fallback: FallbackPolicy::Surface,
            fallback_on: FallbackTrigger::Status,
        }
    }

    /// Absolute URL for this endpoint.
    pub fn url(
        &self,
        base: &Url,
        mode: Option<Mode>,
        business_unit: Option<&str>,
    ) -> Result<Url, DriftError> {
        let template = match (business_unit, self.scoped_path) {
            (Some(_), Some(scoped)) => scoped,
            _ => self.path,
        };
        let mode_number = mode.map(|m| m.number().to_string());

        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| DriftError::Url(base.to_string()))?;
            segments.pop_if_empty();
            for raw in template.split('/').filter(|s| !s.is_empty()) {
                let segment = match (raw, business_unit) {
                    ("{businessUnit}", Some(unit)) => unit.to_string(),
                    _ => match mode_number {
                        Some(ref n) => raw.replace("{mode}", n),
                        None => raw.to_string(),
                    },
                };
                segments.push(&segment);
            }
        }
        Ok(url)
    }
}

const MODE1_RULES: KpiRules = KpiRules {
    rekey_status_row: true,
    pass_through: false,
    reject_empty_value: true,
    lenient_container: false,
};

const MODE2_RULES: KpiRules = KpiRules {
    rekey_status_row: false,
    pass_through: true,
    reject_empty_value: false,
    lenient_container: true,
};

const PLAIN_RULES: KpiRules = KpiRules {
    rekey_status_row: false,
    pass_through: true,
    reject_empty_value: false,
    lenient_container: false,
};

pub const MODE1_KPIS: EndpointDescriptor = EndpointDescriptor {
    container: Some("kpis"),
    guard: BodyGuard::Sentinel,
    kpi_rules: MODE1_RULES,
    ..EndpointDescriptor::surface("mode1 KPIs", "KPIs", "/metrics/{mode}")
};

pub const MODE2_KPIS: EndpointDescriptor = EndpointDescriptor {
    scoped_path: Some("/metrics/{mode}/{businessUnit}"),
    container: Some("kpis"),
    kpi_rules: MODE2_RULES,
    fallback: FallbackPolicy::Synthetic,
    fallback_on: FallbackTrigger::Status,
    ..EndpointDescriptor::surface("mode2 KPIs", "KPIs", "/metrics/{mode}")
};

pub const MODE3_KPIS: EndpointDescriptor = EndpointDescriptor {
    container: Some("kpis"),
    ..EndpointDescriptor::surface("mode3 KPIs", "KPIs", "/metrics/{mode}")
};

pub const MODE4_KPIS: EndpointDescriptor = EndpointDescriptor {
    name: "mode4 KPIs",
    ..MODE3_KPIS
};

pub const ERRORS: EndpointDescriptor = EndpointDescriptor {
    fallback: FallbackPolicy::Synthetic,
    fallback_on: FallbackTrigger::AnyFailure,
    ..EndpointDescriptor::surface("errors", "errors", "/errors")
};

pub const XAI: EndpointDescriptor = EndpointDescriptor {
    scoped_path: Some("/xai/{mode}/{businessUnit}"),
    ..EndpointDescriptor::surface("xai", "XAI data", "/xai/{mode}")
};

pub const BUSINESS_UNITS: EndpointDescriptor = EndpointDescriptor {
    container: Some("units"),
    ..EndpointDescriptor::surface("business units", "business units", "/businessUnits")
};

pub const HEALTH: EndpointDescriptor =
    EndpointDescriptor::surface("health", "health status", "/health");

pub const MODE_SELECTION: EndpointDescriptor = EndpointDescriptor::surface(
    "mode selection",
    "mode selection data",
    "/mode-selection-data",
);

pub const REPORT: EndpointDescriptor =
    EndpointDescriptor::surface("drift report", "drift data", "/mode{mode}/data");

/// KPI descriptor for a mode.
pub fn kpis_for(mode: Mode) -> &'static EndpointDescriptor {
    match mode {
        Mode::Mode1 => &MODE1_KPIS,
        Mode::Mode2 => &MODE2_KPIS,
        Mode::Mode3 => &MODE3_KPIS,
        Mode::Mode4 => &MODE4_KPIS,
    }
}
