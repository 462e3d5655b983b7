//! Error types for the latency-inject library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum LatencyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Parse error in {file} at line {line}: {reason}")]
    Parse {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),

    /// The detector failed or timed out. `detail` carries the original failure text.
    #[error("Detector '{detector}' failed: {detail}")]
    ExternalFailure { detector: String, detail: String },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LatencyError {
    /// Shorthand for building an `InvalidArgument`.
    pub fn invalid(msg: impl Into<String>) -> Self {
        LatencyError::InvalidArgument(msg.into())
    }

    /// True for usage errors raised before any data is touched.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, LatencyError::InvalidArgument(_))
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, LatencyError>;
