//! Evaluation errors.

use thiserror::Error;

/// Errors that can occur while reading, writing or scoring conversations.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The tabular input had no rows at all.
    #[error("Tabular input is missing its header row")]
    MissingHeader,

    /// The first row was not the expected header.
    #[error("Invalid header row: expected {expected:?}, found {found:?}")]
    InvalidHeader {
        /// Expected columns.
        expected: Vec<String>,
        /// Columns actually found.
        found: Vec<String>,
    },

    /// CSV encoding or decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A metric could not produce a score.
    #[error("Metric '{metric}' failed: {message}")]
    MetricFailed {
        /// Metric name.
        metric: String,
        /// Error message.
        message: String,
    },

    /// A reply check was given an invalid regex.
    #[error("Invalid reply pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The judge model call failed or returned something unusable.
    #[error("Judge error: {0}")]
    Judge(String),

    /// Other error.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl EvalError {
    /// Create an invalid header error.
    pub fn invalid_header(expected: &[&str], found: Vec<String>) -> Self {
        Self::InvalidHeader {
            expected: expected.iter().map(|s| (*s).to_string()).collect(),
            found,
        }
    }

    /// Create a metric failed error.
    pub fn metric_failed(metric: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MetricFailed {
            metric: metric.into(),
            message: message.into(),
        }
    }

    /// Create a judge error.
    pub fn judge(msg: impl Into<String>) -> Self {
        Self::Judge(msg.into())
    }

    /// Whether this error means the input was not a conversation report at all.
    pub fn is_header_error(&self) -> bool {
        matches!(self, Self::MissingHeader | Self::InvalidHeader { .. })
    }
}

/// Result type for evaluation operations.
pub type EvalResult<T> = Result<T, EvalError>;
