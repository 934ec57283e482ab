//! Error types for chart documents.

use thiserror::Error;

/// Result type for chart operations.
pub type ChartResult<T> = Result<T, ChartError>;

/// Errors raised while reading or writing chart documents.
#[derive(Debug, Error)]
pub enum ChartError {
    /// The persisted document is not valid JSON.
    #[error("chart document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The persisted document is JSON but not an object keyed by lane count.
    #[error("chart document must be a JSON object, found {found}")]
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },

    /// A per-key entry does not have the `{maxscore, chaebo}` shape.
    #[error("chart entry '{key}' is malformed: {message}")]
    MalformedEntry {
        /// Lane-count key of the entry.
        key: String,
        /// Error message.
        message: String,
    },

    /// Lane count is not 4, 5 or 6.
    #[error("unsupported key mode: {value} (expected 4, 5 or 6)")]
    UnsupportedKeyMode {
        /// The rejected value.
        value: String,
    },
}

impl ChartError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ChartError::Json(_) => "CHART_001",
            ChartError::NotAnObject { .. } => "CHART_002",
            ChartError::MalformedEntry { .. } => "CHART_003",
            ChartError::UnsupportedKeyMode { .. } => "CHART_004",
        }
    }
}
