//! Resilient fetch-and-normalize client for the drift monitoring backend.
//!
//! [`DriftClient`] retries transient failures, guards mode-1 KPI bodies
//! against backend error codes and junk around the JSON, normalizes every
//! response into the entity types of `driftwatch-core`, and substitutes
//! synthetic sample data where a page prefers that to an error.

pub mod body;
pub mod cache;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod report;
pub mod retry;
pub mod sentinel;

pub use cache::ModeSelectionCache;
pub use client::{DashboardSnapshot, DriftClient, FetchOptions, Fetched, Origin};
pub use endpoint::{EndpointDescriptor, FallbackPolicy};
pub use error::{DriftError, ErrorKind};
pub use report::DriftReport;
pub use retry::{fetch_with_retry, RequestOptions, RetryPolicy};
pub use sentinel::{SentinelDetector, SentinelMatcher};
