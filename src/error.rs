//! Error types for event_clusters.

use thiserror::Error;

/// Result type for event_clusters operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for event_clusters operations.
///
/// Insufficient-data conditions (too few documents to vectorize, too few
/// events to cluster, zero-denominator metrics) are not errors; they surface
/// as typed outcomes on the returning call.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed input: bad span, mismatched mention type, out-of-range k.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A period could not be completed because no year is specified.
    #[error("Incomplete period: {0}")]
    IncompletePeriod(String),

    /// A completed period names a calendar date that does not exist.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Evaluation inputs are inconsistent (e.g. cyclic reference hierarchy).
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create an incomplete period error.
    pub fn incomplete_period(msg: impl Into<String>) -> Self {
        Error::IncompletePeriod(msg.into())
    }

    /// Create an invalid date error.
    pub fn invalid_date(msg: impl Into<String>) -> Self {
        Error::InvalidDate(msg.into())
    }

    /// Create an evaluation error.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Error::Evaluation(msg.into())
    }
}
