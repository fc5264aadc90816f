use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64_opt(profile: &str, key: &str) -> Option<u64> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub backend: BackendConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DRIFT_PROFILE`. When set (e.g. `STAGING`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DRIFT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            backend: BackendConfig::from_env_profiled(p),
            cache: CacheConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  backend:     api_base={}, retries={}, retry_delay_ms={}, timeout_secs={}",
            self.backend.api_base,
            self.backend.max_retries,
            self.backend.retry_delay_ms,
            self.backend.request_timeout_secs
        );
        match self.cache.mode_selection_ttl_secs {
            Some(ttl) => tracing::info!("  cache:       mode_selection_ttl_secs={}", ttl),
            None => tracing::info!("  cache:       mode_selection_ttl_secs=(never expires)"),
        }
    }

    /// Return a view safe for diagnostics output.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "backend": {
                "api_base": self.backend.api_base,
                "max_retries": self.backend.max_retries,
                "retry_delay_ms": self.backend.retry_delay_ms,
                "request_timeout_secs": self.backend.request_timeout_secs,
            },
            "cache": { "mode_selection_ttl_secs": self.cache.mode_selection_ttl_secs },
        })
    }
}

// ── Backend ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL every endpoint path is appended to.
    pub api_base: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Per-request timeout; 0 disables it.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            api_base: profiled_env_or(p, "DRIFT_API_BASE", DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            max_retries: profiled_env_u32(p, "DRIFT_MAX_RETRIES", DEFAULT_MAX_RETRIES),
            retry_delay_ms: profiled_env_u64_opt(p, "DRIFT_RETRY_DELAY_MS")
                .unwrap_or(DEFAULT_RETRY_DELAY_MS),
            request_timeout_secs: profiled_env_u64_opt(p, "DRIFT_REQUEST_TIMEOUT_SECS")
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

// ── Cache ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Mode-selection cache lifetime. `None` keeps the first answer for the
    /// lifetime of the process.
    pub mode_selection_ttl_secs: Option<u64>,
}

impl CacheConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            mode_selection_ttl_secs: profiled_env_u64_opt(p, "DRIFT_MODE_CACHE_TTL_SECS"),
        }
    }

    pub fn mode_selection_ttl(&self) -> Option<Duration> {
        self.mode_selection_ttl_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let cfg = Config::default();
        assert_eq!(cfg.backend.api_base, "http://localhost:5000/api");
        assert_eq!(cfg.backend.max_retries, 3);
        assert_eq!(cfg.backend.retry_delay(), Duration::from_millis(1000));
        assert!(cfg.cache.mode_selection_ttl().is_none());
        assert_eq!(cfg.profile_label(), "default");
    }

    #[test]
    fn profile_prefix_wins_over_plain_key() {
        std::env::set_var("DRIFTCFGTEST_DRIFT_API_BASE", "http://staging:9000/api/");
        std::env::set_var("DRIFTCFGTEST_DRIFT_MAX_RETRIES", "5");
        let cfg = Config::for_profile("driftcfgtest");
        assert_eq!(cfg.profile, "DRIFTCFGTEST");
        assert_eq!(cfg.backend.api_base, "http://staging:9000/api");
        assert_eq!(cfg.backend.max_retries, 5);
        std::env::remove_var("DRIFTCFGTEST_DRIFT_API_BASE");
        std::env::remove_var("DRIFTCFGTEST_DRIFT_MAX_RETRIES");
    }

    #[test]
    fn zero_timeout_disables_it() {
        let backend = BackendConfig { request_timeout_secs: 0, ..BackendConfig::default() };
        assert!(backend.request_timeout().is_none());
    }

    #[test]
    fn redacted_summary_shape() {
        let summary = Config::default().redacted_summary();
        assert_eq!(summary["profile"], "default");
        assert_eq!(summary["backend"]["max_retries"], 3);
        assert!(summary["cache"]["mode_selection_ttl_secs"].is_null());
    }
}
