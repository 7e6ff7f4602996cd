//! Source errors.

use thiserror::Error;

/// Errors raised while talking to conversation sources.
///
/// The fetchers' [`MessageSource`](crate::MessageSource) methods swallow
/// these into empty results; the `try_*` methods surface them.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The response body was not what we expected.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A required setting is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SourceError {
    /// Create an API error.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether the API rejected our credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = SourceError::api(404, "not found");
        assert_eq!(err.to_string(), "API error (404): not found");
        assert!(!err.is_auth_error());
        assert!(SourceError::api(401, "").is_auth_error());
    }

    #[test]
    fn test_missing_config_display() {
        let err = SourceError::MissingConfig("KUSTOMER_API_KEY");
        assert_eq!(err.to_string(), "Missing configuration: KUSTOMER_API_KEY");
    }
}
