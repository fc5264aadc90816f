//! Error taxonomy for backend fetches.

use std::sync::Arc;

/// Coarse classification of a [`DriftError`], used for retry and fallback
/// decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network/transport failure.
    Transport,
    /// Non-2xx HTTP status.
    Status,
    /// Backend emitted an error code instead of a JSON body.
    Sentinel,
    /// Body is not JSON, or JSON could not be recovered from it.
    Malformed,
    /// JSON with the wrong container type.
    Shape,
    /// A single record failed validation.
    Field,
    /// Client construction problem (bad base URL, mode).
    Config,
}

/// Errors that can occur while fetching and normalizing backend data.
#[derive(Debug, thiserror::Error)]
pub enum DriftError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error! status: {status} ({url})")]
    Status { url: String, status: u16, body: String },

    #[error("Backend service temporarily unavailable (code: {code})")]
    Sentinel { code: String },

    #[error("Unexpected API response format: {0}")]
    Format(String),

    #[error("API response parsing failed: {0}")]
    Parse(String),

    #[error("{0}")]
    Shape(String),

    #[error("{0}")]
    Field(String),

    #[error("invalid backend URL: {0}")]
    Url(String),

    /// A failure from one of the `fetch_*` operations, carrying the noun used
    /// in the user-facing message. The underlying error is the `source`.
    #[error("Failed to fetch {what}: {source}")]
    Endpoint {
        what: &'static str,
        #[source]
        source: Box<DriftError>,
    },

    /// One failure handed to several waiters, e.g. callers that missed the
    /// mode-selection cache together.
    #[error(transparent)]
    Shared(Arc<DriftError>),
}

impl DriftError {
    /// Innermost error, skipping any `Endpoint` or `Shared` wrappers.
    pub fn root(&self) -> &DriftError {
        match self {
            DriftError::Endpoint { source, .. } => source.root(),
            DriftError::Shared(inner) => inner.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            DriftError::Transport { .. } => ErrorKind::Transport,
            DriftError::Status { .. } => ErrorKind::Status,
            DriftError::Sentinel { .. } => ErrorKind::Sentinel,
            DriftError::Format(_) | DriftError::Parse(_) => ErrorKind::Malformed,
            DriftError::Shape(_) => ErrorKind::Shape,
            DriftError::Field(_) => ErrorKind::Field,
            DriftError::Url(_) => ErrorKind::Config,
            DriftError::Endpoint { source, .. } => source.kind(),
            DriftError::Shared(inner) => inner.kind(),
        }
    }

    /// Whether the transport layer retries this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Status)
    }

    /// HTTP status when the failure was a non-2xx answer.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            DriftError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short message that is safe to show in an error banner.
    pub fn user_message(&self) -> String {
        match self {
            DriftError::Endpoint { what, .. } => {
                format!("Failed to fetch {what}. Please try again later.")
            }
            DriftError::Sentinel { code } => {
                format!("Backend service temporarily unavailable (code: {code})")
            }
            DriftError::Shared(inner) => inner.user_message(),
            _ => "The drift service returned an unexpected response.".to_string(),
        }
    }

    pub(crate) fn endpoint(what: &'static str, source: DriftError) -> Self {
        DriftError::Endpoint {
            what,
            source: Box::new(source),
        }
    }
}
