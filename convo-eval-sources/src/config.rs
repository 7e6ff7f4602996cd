//! Source configuration.

use crate::error::{SourceError, SourceResult};
use reqwest::Client;
use std::time::Duration;

/// Default Kustomer API base URL.
pub const DEFAULT_KUSTOMER_BASE_URL: &str = "https://api.kustomerapp.com/v1";

/// Default chatbot test endpoint.
pub const DEFAULT_CHATBOT_API_URL: &str =
    "https://gametime-ai-chatbot-staging.vercel.app/api/dot/test-response";

/// Default bearer token for the chatbot test endpoint.
pub const DEFAULT_JWT_SECRET: &str = "test-token";

/// Default purchase confirmation number sent with chatbot requests.
pub const DEFAULT_CONFIRMATION_NUMBER: &str = "ZT268QDK3D";

/// Chatbot request timeout.
pub const CHATBOT_TIMEOUT: Duration = Duration::from_secs(30);

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Kustomer API configuration.
#[derive(Debug, Clone)]
pub struct KustomerConfig {
    /// API key, sent as a bearer token.
    pub api_key: String,
    /// API base URL.
    pub base_url: String,
    /// Only fetch conversations assigned to this user.
    pub assigned_user_id: Option<String>,
    /// Only fetch conversations in this queue.
    pub queue_id: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl KustomerConfig {
    /// Create a config with an API key and the default base URL.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_KUSTOMER_BASE_URL.to_string(),
            assigned_user_id: None,
            queue_id: None,
            timeout: None,
        }
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the assigned user filter.
    #[must_use]
    pub fn with_assigned_user(mut self, user_id: impl Into<String>) -> Self {
        self.assigned_user_id = Some(user_id.into());
        self
    }

    /// Set the queue filter.
    #[must_use]
    pub fn with_queue(mut self, queue_id: impl Into<String>) -> Self {
        self.queue_id = Some(queue_id.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load from environment variables.
    ///
    /// Looks for:
    /// - `KUSTOMER_API_KEY` (required)
    /// - `KUSTOMER_BASE_URL`
    /// - `KUSTOMER_ASSIGNED_USER_ID`
    /// - `KUSTOMER_QUEUE_ID`
    pub fn from_env() -> SourceResult<Self> {
        let api_key =
            env_var("KUSTOMER_API_KEY").ok_or(SourceError::MissingConfig("KUSTOMER_API_KEY"))?;
        Ok(Self {
            api_key,
            base_url: env_var("KUSTOMER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_KUSTOMER_BASE_URL.to_string()),
            assigned_user_id: env_var("KUSTOMER_ASSIGNED_USER_ID"),
            queue_id: env_var("KUSTOMER_QUEUE_ID"),
            timeout: None,
        })
    }

    pub(crate) fn build_client(&self) -> SourceResult<Client> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

/// Chatbot test endpoint configuration.
#[derive(Debug, Clone)]
pub struct ChatbotConfig {
    /// Endpoint URL.
    pub api_url: String,
    /// Bearer token.
    pub jwt_secret: String,
    /// Purchase confirmation number sent with every message.
    pub confirmation_number: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_CHATBOT_API_URL.to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            confirmation_number: DEFAULT_CONFIRMATION_NUMBER.to_string(),
            timeout: CHATBOT_TIMEOUT,
        }
    }
}

impl ChatbotConfig {
    /// Create the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = secret.into();
        self
    }

    /// Set the confirmation number.
    #[must_use]
    pub fn with_confirmation_number(mut self, number: impl Into<String>) -> Self {
        self.confirmation_number = number.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// Looks for `CHATBOT_API_URL`, `JWT_SECRET` and
    /// `CHATBOT_CONFIRMATION_NUMBER`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: env_var("CHATBOT_API_URL").unwrap_or(defaults.api_url),
            jwt_secret: env_var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            confirmation_number: env_var("CHATBOT_CONFIRMATION_NUMBER")
                .unwrap_or(defaults.confirmation_number),
            timeout: defaults.timeout,
        }
    }

    pub(crate) fn build_client(&self) -> SourceResult<Client> {
        Ok(Client::builder().timeout(self.timeout).build()?)
    }
}
