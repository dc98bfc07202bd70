//! Error taxonomy for all docsi operations.
//!
//! Every public API returns `Result<T, DocsiError>`. The variants map
//! one-to-one onto how failures propagate: network errors are retried,
//! client errors are not, parse errors substitute empty results, and
//! policy rejections are routine outcomes rather than faults.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DocsiError>;

/// Unified error type for crawling, storage, and search operations.
#[derive(Debug, Error)]
pub enum DocsiError {
    /// Bad input: invalid URL, malformed pattern, unknown identifier,
    /// or a limit overflow detected before any work started.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport-level failure (timeout, DNS, connection reset) or an
    /// HTTP 5xx after retries were exhausted.
    #[error("network error: {0}")]
    Network(String),

    /// HTTP 4xx response. Never retried; the URL is marked failed and
    /// the crawl continues.
    #[error("http {status} for {url}")]
    HttpClient { status: u16, url: String },

    /// HTML/XML/JSON could not be parsed. Callers substitute an empty
    /// result and keep going.
    #[error("parse error: {0}")]
    Parse(String),

    /// Filesystem failure while persisting or reading documents.
    #[error("storage error: {0}")]
    Storage(String),

    /// The URL was rejected by include/exclude/depth/host policy.
    /// Routine during crawling, not reported as a job failure.
    #[error("rejected by policy: {0}")]
    Policy(String),

    /// The crawl was cancelled cooperatively.
    #[error("operation cancelled")]
    Cancelled,

    /// Invariant violation. The only kind for which panicking would
    /// also have been acceptable.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DocsiError {
    /// Exit code for the CLI wrapper.
    ///
    /// `0` is success and produced by the caller; everything here is a
    /// failure class.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::Policy(_) => 1,
            Self::Network(_) | Self::HttpClient { .. } => 2,
            Self::Storage(_) => 3,
            Self::Cancelled => 4,
            Self::Parse(_) | Self::Internal(_) => 5,
        }
    }

    /// Whether a fetch that failed with this error should be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<std::io::Error> for DocsiError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DocsiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for DocsiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Self::Network(err.to_string());
        }
        match err.status() {
            Some(status) if status.is_client_error() => Self::HttpClient {
                status: status.as_u16(),
                url: err.url().map(ToString::to_string).unwrap_or_default(),
            },
            _ => Self::Network(err.to_string()),
        }
    }
}
