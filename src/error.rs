//! Error types for bloomcast operations.
//!
//! Every failure of a pipeline run maps onto one variant of [`BloomError`].
//! Runs are offline batch jobs, so errors are never recovered internally:
//! they propagate to the caller, which reports them and aborts.

use thiserror::Error;

/// Main error type for bloomcast operations.
///
/// # Examples
///
/// ```
/// use bloomcast::error::BloomError;
///
/// let err = BloomError::configuration("test_fraction must lie in (0, 1), got 1.5");
/// assert!(err.to_string().contains("test_fraction"));
/// ```
#[derive(Debug, Error)]
pub enum BloomError {
    /// Invalid split fraction, feature keys, columns or hyperparameter grid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// What was wrong with the configuration
        message: String,
    },

    /// Too few rows to produce the requested slices or folds.
    #[error("Insufficient data for {context}: need at least {needed} rows, got {actual}")]
    InsufficientData {
        /// Operation that ran out of rows
        context: String,
        /// Minimum row count required
        needed: usize,
        /// Row count available
        actual: usize,
    },

    /// Bloom calendar cannot produce a date strictly after the reference.
    #[error("Calendar underflow: {message}")]
    CalendarUnderflow {
        /// Description including the offending reference date
        message: String,
    },

    /// A single input row could not be parsed.
    #[error("Malformed row at line {row}, column '{column}': {reason}")]
    MalformedRow {
        /// 1-based line number in the source file (header is line 1)
        row: usize,
        /// Column holding the bad value
        column: String,
        /// Parse failure detail
        reason: String,
    },

    /// Matrix/vector dimensions don't match for the operation.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Normal equations are not positive definite.
    #[error("Singular matrix: system is not positive definite")]
    SingularMatrix,

    /// A model or transformer was used before `fit`.
    #[error("{what} is not fitted, call fit() first")]
    NotFitted {
        /// Name of the unfitted component
        what: &'static str,
    },

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding/decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Model artifact could not be encoded or decoded.
    #[error("Artifact error: {message}")]
    Artifact {
        /// Error description
        message: String,
    },
}

impl BloomError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an insufficient-data error.
    #[must_use]
    pub fn insufficient_data(context: impl Into<String>, needed: usize, actual: usize) -> Self {
        Self::InsufficientData {
            context: context.into(),
            needed,
            actual,
        }
    }

    /// Create a calendar underflow error.
    #[must_use]
    pub fn calendar_underflow(message: impl Into<String>) -> Self {
        Self::CalendarUnderflow {
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error with descriptive context.
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }
}

impl From<bincode::Error> for BloomError {
    fn from(err: bincode::Error) -> Self {
        Self::Artifact {
            message: err.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, BloomError>;
