//! Error types shared by the engines and the orchestrators.
//!
//! Adapter failures are [`EngineError`]s. They never abort a batch: the
//! orchestrators feed them to the backend's rate limiter and fold whatever
//! is left into a soft [`BatchError`] summary.

use std::fmt;

/// Failure of a single backend request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Transport-level failure (connection refused, timeout, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend reported an error inside an otherwise valid payload.
    #[error("api error: {0}")]
    Api(String),

    /// The backend signalled throttling explicitly.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The API key has no entitlement for the requested data.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The engine is misconfigured (missing key, bad URL).
    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => EngineError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => EngineError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Parse(err.to_string())
    }
}

/// Returned by rate limiter sleeps and orchestrator steps once the
/// caller's cancellation token has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// One entry of a batch's soft error summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// The target value or company name that produced nothing.
    pub subject: String,
    /// Per-backend reasons, in the order the backends were tried.
    pub reasons: Vec<String>,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.subject, self.reasons.join("; "))
    }
}

/// Non-fatal summary of the targets (or companies) for which every
/// attempted backend failed.
///
/// A batch carrying this error may still have produced results for the
/// other subjects; callers must not read it as "nothing was found".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} of {total} searches failed: {}", .failures.len(), join_failures(.failures))]
pub struct BatchError {
    pub total: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchError {
    /// Build the summary, or `None` when nothing failed.
    pub fn from_failures(total: usize, failures: Vec<BatchFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { total, failures })
        }
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

fn join_failures(failures: &[BatchFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
