//! Fixed-interval retry around a single HTTP request.
//!
//! A transport failure or a non-2xx status counts as a failed attempt. The
//! wait between attempts is constant: no jitter, no backoff.

use std::time::Duration;

use reqwest::{Client, Method, Response};
use tracing::{debug, warn};

use crate::error::DriftError;

/// How many times a request is repeated after its first failure, and how
/// long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (total attempts = `retries + 1`).
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_RETRIES: u32 = 3;
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

    pub const fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// A single attempt, no retries.
    pub const fn none() -> Self {
        Self::new(0, Self::DEFAULT_DELAY)
    }

    pub fn with_retries(self, retries: u32) -> Self {
        Self { retries, ..self }
    }

    /// Saturates at `u32::MAX`.
    pub fn total_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RETRIES, Self::DEFAULT_DELAY)
    }
}

/// Per-request options. Defaults to a plain `GET`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Send a request, retrying on transport failure or non-2xx status.
///
/// Once the budget is spent the last failure is returned as-is
/// ([`DriftError::Transport`] or [`DriftError::Status`]); this layer never
/// wraps it.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    options: &RequestOptions,
    policy: RetryPolicy,
) -> Result<Response, DriftError> {
    let mut remaining = policy.retries;
    let mut attempt: u32 = 1;

    loop {
        match send_once(client, url, options).await {
            Ok(response) => return Ok(response),
            Err(err) if remaining > 0 => {
                warn!(
                    url,
                    attempt,
                    max_retries = policy.retries,
                    error = %err,
                    "Retrying {} ({}/{})",
                    url,
                    attempt,
                    policy.retries
                );
                tokio::time::sleep(policy.delay).await;
                remaining -= 1;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn send_once(
    client: &Client,
    url: &str,
    options: &RequestOptions,
) -> Result<Response, DriftError> {
    let mut request = client.request(options.method.clone(), url);
    for (key, value) in &options.headers {
        request = request.header(key.as_str(), value.as_str());
    }
    if let Some(ref body) = options.body {
        request = request.body(body.clone());
    }
    if let Some(timeout) = options.timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await.map_err(|source| DriftError::Transport {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        debug!(url, %status, body = %body, "backend returned non-2xx status");
        return Err(DriftError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}
