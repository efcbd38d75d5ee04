//! Error taxonomy for the search orchestrator.
//!
//! `search()` is infallible for any single-backend failure that a fallback
//! path recovers from — those are folded into [`crate::model::ErrorSummary`]
//! entries on the returned envelope instead. [`SmartSearchError`] carries only
//! the paths spec.md documents as thrown: validation failures and
//! cancellation. `BothBackendsFailed` is deliberately *not* a variant here —
//! per the propagation policy it surfaces as a successful, empty envelope
//! with populated `errors`, never as a thrown error.

use thiserror::Error;

/// Errors `SmartSearch::search` can return.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmartSearchError {
    /// The request failed validation before any backend was contacted.
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller's cancellation handle was triggered mid-request.
    #[error("search cancelled")]
    Cancelled,
}

/// Result alias for fallible orchestrator operations.
pub type Result<T> = std::result::Result<T, SmartSearchError>;

/// Classification of a recovered, non-fatal backend failure.
///
/// Recorded on [`crate::model::ErrorSummary`] and on the stats aggregator's
/// `errors_total{kind}` counter. Never thrown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A backend operation exceeded its per-operation deadline.
    BackendTimeout,
    /// The backend refused the call outright (connection refused, breaker
    /// already open, explicit unavailability signal).
    BackendUnavailable,
    /// A cache entry failed to deserialize or carried an unknown schema
    /// version.
    SerializationError,
}

impl ErrorKind {
    /// Stable label used in stats counters and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BackendTimeout => "backend_timeout",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::SerializationError => "serialization_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
