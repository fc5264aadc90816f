//! The drift backend client.
//!
//! Every `fetch_*` operation runs the same pipeline: resolve the endpoint
//! URL, send with retry, turn the body into JSON (guarded for mode-1 KPIs),
//! normalize, and finally apply the endpoint's fallback policy. Failures are
//! logged here with full detail and returned wrapped in
//! [`DriftError::Endpoint`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use driftwatch_core::{Config, ErrorDataState, Kpi, Mode, ModeSelectionEntry, UserUseCase};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::body::{parse_strict, parse_tolerant};
use crate::cache::ModeSelectionCache;
use crate::endpoint::{self, BodyGuard, EndpointDescriptor, FallbackPolicy};
use crate::error::DriftError;
use crate::fallback;
use crate::normalize::{normalize_errors, normalize_explanation, normalize_kpis, normalize_names};
use crate::report::{build_report, DriftReport};
use crate::retry::{fetch_with_retry, RequestOptions, RetryPolicy};
use crate::sentinel::SentinelDetector;

// ── Results ───────────────────────────────────────────────────

/// Where a successful result came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Origin {
    Backend,
    /// Generated sample data; `reason` says what the backend did instead.
    Synthetic { reason: String },
}

/// Data plus its [`Origin`], so a page can show its error banner next to
/// sample data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    pub data: T,
    pub origin: Origin,
}

impl<T> Fetched<T> {
    pub fn backend(data: T) -> Self {
        Self {
            data,
            origin: Origin::Backend,
        }
    }

    pub fn synthetic(data: T, reason: impl Into<String>) -> Self {
        Self {
            data,
            origin: Origin::Synthetic {
                reason: reason.into(),
            },
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.origin, Origin::Synthetic { .. })
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

/// Per-call overrides for the KPI and error operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Retry policy for this call; the client's policy when `None`.
    pub retry: Option<RetryPolicy>,
    /// Fallback policy for this call; the endpoint's policy when `None`.
    pub fallback: Option<FallbackPolicy>,
}

impl FetchOptions {
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = Some(policy);
        self
    }
}

/// Results of one dashboard load. Each part succeeds or fails on its own.
#[derive(Debug)]
pub struct DashboardSnapshot {
    pub kpis: Result<Fetched<Vec<Kpi>>, DriftError>,
    pub errors: Result<Fetched<ErrorDataState>, DriftError>,
    pub explanation: Result<String, DriftError>,
}

// ── Client ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DriftClient {
    http: reqwest::Client,
    base: Url,
    retry: RetryPolicy,
    timeout: Option<Duration>,
    sentinels: SentinelDetector,
    mode_cache: Arc<ModeSelectionCache>,
}

impl DriftClient {
    /// Client for `base_url` (for example `http://localhost:5000/api`) with
    /// the default retry policy and no request timeout.
    pub fn new(base_url: &str) -> Result<Self, DriftError> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| DriftError::Url(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(DriftError::Url(base_url.to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            retry: RetryPolicy::default(),
            timeout: None,
            sentinels: SentinelDetector::default(),
            mode_cache: Arc::new(ModeSelectionCache::default()),
        })
    }

    /// Client built from resolved configuration.
    pub fn from_config(config: &Config) -> Result<Self, DriftError> {
        let backend = &config.backend;
        let mut client = Self::new(&backend.api_base)?.with_retry_policy(RetryPolicy::new(
            backend.max_retries,
            backend.retry_delay(),
        ));
        client.timeout = backend.request_timeout();
        client.mode_cache = Arc::new(ModeSelectionCache::new(config.cache.mode_selection_ttl()));
        Ok(client)
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share a mode-selection cache, e.g. between clients or with a test.
    pub fn with_mode_cache(mut self, cache: Arc<ModeSelectionCache>) -> Self {
        self.mode_cache = cache;
        self
    }

    pub fn with_sentinels(mut self, sentinels: SentinelDetector) -> Self {
        self.sentinels = sentinels;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn mode_cache(&self) -> &Arc<ModeSelectionCache> {
        &self.mode_cache
    }

    // ── Operations ────────────────────────────────────────────

    /// `true` iff `/health` answers 2xx on the first and only attempt.
    pub async fn check_health(&self) -> bool {
        let url = match endpoint::HEALTH.url(&self.base, None, None) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "Backend health check failed");
                return false;
            }
        };

        let options = self.request_options();
        match fetch_with_retry(&self.http, url.as_str(), &options, RetryPolicy::none()).await {
            Ok(_) => true,
            Err(e) => {
                warn!(url = %url, error = %e, "Backend health check failed");
                false
            }
        }
    }

    pub async fn fetch_business_units(&self) -> Result<Vec<String>, DriftError> {
        let desc = &endpoint::BUSINESS_UNITS;
        let result = self
            .fetch_json(desc, None, None, self.retry)
            .await
            .and_then(|value| normalize_names(&value, desc.container));
        self.surface(desc, result)
    }

    pub async fn fetch_kpis(
        &self,
        mode: Mode,
        business_unit: Option<&str>,
    ) -> Result<Fetched<Vec<Kpi>>, DriftError> {
        self.fetch_kpis_with(mode, business_unit, FetchOptions::default())
            .await
    }

    /// KPIs for `mode`. The business unit only narrows endpoints that have a
    /// scoped path (mode 2); elsewhere it is ignored.
    pub async fn fetch_kpis_with(
        &self,
        mode: Mode,
        business_unit: Option<&str>,
        options: FetchOptions,
    ) -> Result<Fetched<Vec<Kpi>>, DriftError> {
        let desc = endpoint::kpis_for(mode);
        let policy = options.retry.unwrap_or(self.retry);

        let result = self
            .fetch_json(desc, Some(mode), business_unit, policy)
            .await
            .and_then(|value| normalize_kpis(&value, desc.container, &desc.kpi_rules));

        self.with_fallback(desc, options, result, Vec::is_empty, || {
            fallback::mock_kpis(&mut rand::thread_rng(), Utc::now())
        })
    }

    pub async fn fetch_errors(&self) -> Result<Fetched<ErrorDataState>, DriftError> {
        self.fetch_errors_with(FetchOptions::default()).await
    }

    pub async fn fetch_errors_with(
        &self,
        options: FetchOptions,
    ) -> Result<Fetched<ErrorDataState>, DriftError> {
        let desc = &endpoint::ERRORS;
        let policy = options.retry.unwrap_or(self.retry);

        let result = self
            .fetch_json(desc, None, None, policy)
            .await
            .and_then(|value| normalize_errors(&value, &fallback::timestamp(Utc::now())));

        self.with_fallback(desc, options, result, ErrorDataState::is_empty, || {
            fallback::sample_errors(&mut rand::thread_rng(), Utc::now())
        })
    }

    /// Model explanation for `mode`, optionally scoped to a business unit.
    pub async fn fetch_explanation(
        &self,
        mode: Mode,
        business_unit: Option<&str>,
    ) -> Result<String, DriftError> {
        let desc = &endpoint::XAI;
        let result = self
            .fetch_json(desc, Some(mode), business_unit, self.retry)
            .await
            .and_then(|value| normalize_explanation(&value));
        self.surface(desc, result)
    }

    /// The mode-selection table, served from the cache when present.
    /// Concurrent callers that miss share one request.
    pub async fn fetch_mode_selection(&self) -> Result<Arc<Vec<ModeSelectionEntry>>, DriftError> {
        if let Some(entries) = self.mode_cache.get().await {
            debug!(entries = entries.len(), "mode selection served from cache");
            return Ok(entries);
        }

        let desc = &endpoint::MODE_SELECTION;
        let result = self
            .mode_cache
            .get_or_fetch(async {
                let value = self.fetch_json(desc, None, None, self.retry).await?;
                let entries = serde_json::from_value::<Vec<ModeSelectionEntry>>(value)
                    .map_err(|e| DriftError::Shape(format!("Invalid mode selection data: {e}")))?;
                info!(entries = entries.len(), "mode selection data cached");
                Ok::<_, DriftError>(entries)
            })
            .await;
        self.surface(desc, result)
    }

    /// Use cases assigned to `user`, in table order.
    pub async fn use_cases_for_user(&self, user: &str) -> Result<Vec<UserUseCase>, DriftError> {
        let entries = self.fetch_mode_selection().await?;
        Ok(entries
            .iter()
            .filter(|entry| entry.user == user)
            .map(UserUseCase::from)
            .collect())
    }

    /// Full drift report for `mode` from `/mode{n}/data`.
    pub async fn fetch_report(&self, mode: Mode) -> Result<DriftReport, DriftError> {
        let desc = &endpoint::REPORT;
        let result = self
            .fetch_json(desc, Some(mode), None, self.retry)
            .await
            .and_then(|value| build_report(mode, &value));
        self.surface(desc, result)
    }

    /// KPIs, errors and explanation for one page, fetched concurrently.
    pub async fn fetch_dashboard(
        &self,
        mode: Mode,
        business_unit: Option<&str>,
    ) -> DashboardSnapshot {
        let (kpis, errors, explanation) = tokio::join!(
            self.fetch_kpis(mode, business_unit),
            self.fetch_errors(),
            self.fetch_explanation(mode, business_unit),
        );
        DashboardSnapshot {
            kpis,
            errors,
            explanation,
        }
    }

    // ── Pipeline ──────────────────────────────────────────────

    fn request_options(&self) -> RequestOptions {
        RequestOptions {
            timeout: self.timeout,
            ..RequestOptions::default()
        }
        .header("Accept", "application/json")
    }

    /// Fetch an endpoint and parse its body according to its guard.
    async fn fetch_json(
        &self,
        desc: &EndpointDescriptor,
        mode: Option<Mode>,
        business_unit: Option<&str>,
        policy: RetryPolicy,
    ) -> Result<Value, DriftError> {
        let url = desc.url(&self.base, mode, business_unit)?;
        match desc.guard {
            BodyGuard::Plain => {
                let text = self.fetch_text(url.as_str(), policy).await?;
                parse_strict(&text).inspect_err(|e| {
                    error!(
                        endpoint = desc.name,
                        url = %url,
                        body = %text,
                        error = %e,
                        "API response parsing failed"
                    );
                })
            }
            BodyGuard::Sentinel => self.fetch_guarded(desc, url.as_str(), policy).await,
        }
    }

    async fn fetch_text(&self, url: &str, policy: RetryPolicy) -> Result<String, DriftError> {
        let response = fetch_with_retry(&self.http, url, &self.request_options(), policy).await?;
        response.text().await.map_err(|source| DriftError::Transport {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch with sentinel detection. A detected code restarts the whole
    /// fetch after the retry delay until the budget is spent.
    async fn fetch_guarded(
        &self,
        desc: &EndpointDescriptor,
        url: &str,
        policy: RetryPolicy,
    ) -> Result<Value, DriftError> {
        let mut remaining = policy.retries;

        loop {
            let response =
                fetch_with_retry(&self.http, url, &self.request_options(), policy).await?;
            let status = response.status();
            debug!(
                endpoint = desc.name,
                url,
                %status,
                headers = ?response.headers(),
                "API response"
            );

            let text = response.text().await.map_err(|source| DriftError::Transport {
                url: url.to_string(),
                source,
            })?;
            debug!(endpoint = desc.name, body = %text, length = text.len(), "Raw API response");

            let Some(code) = self.sentinels.detect(&text) else {
                return parse_tolerant(&text).inspect_err(|e| {
                    error!(
                        endpoint = desc.name,
                        url,
                        %status,
                        body = %text,
                        error = %e,
                        "API response parsing failed"
                    );
                });
            };

            let attempt = (policy.retries - remaining).saturating_add(1);
            error!(
                endpoint = desc.name,
                url,
                %status,
                code = %code,
                attempt,
                body = %text,
                "Backend error detected"
            );
            if remaining == 0 {
                return Err(DriftError::Sentinel { code });
            }
            warn!(endpoint = desc.name, code = %code, "Retrying due to backend error code");
            tokio::time::sleep(policy.delay).await;
            remaining -= 1;
        }
    }

    /// Log and wrap a failure; pass a success through.
    fn surface<T>(
        &self,
        desc: &EndpointDescriptor,
        result: Result<T, DriftError>,
    ) -> Result<T, DriftError> {
        result.map_err(|err| {
            error!(endpoint = desc.name, error = %err, "Failed to fetch {}", desc.what);
            DriftError::endpoint(desc.what, err)
        })
    }

    /// Apply the fallback policy: synthetic data on an empty answer or a
    /// covered failure, otherwise the backend result or a wrapped error.
    fn with_fallback<T>(
        &self,
        desc: &EndpointDescriptor,
        options: FetchOptions,
        result: Result<T, DriftError>,
        is_empty: impl FnOnce(&T) -> bool,
        generate: impl FnOnce() -> T,
    ) -> Result<Fetched<T>, DriftError> {
        let synthetic = options.fallback.unwrap_or(desc.fallback) == FallbackPolicy::Synthetic;

        match result {
            Ok(data) if synthetic && is_empty(&data) => {
                warn!(endpoint = desc.name, "Empty {} received, using sample data", desc.what);
                Ok(Fetched::synthetic(generate(), format!("backend returned no {}", desc.what)))
            }
            Ok(data) => Ok(Fetched::backend(data)),
            Err(err) if synthetic && desc.fallback_on.covers(&err) => {
                warn!(
                    endpoint = desc.name,
                    error = %err,
                    "Failed to fetch {}, using sample data",
                    desc.what
                );
                Ok(Fetched::synthetic(generate(), err.to_string()))
            }
            Err(err) => self.surface(desc, Err(err)),
        }
    }
}
