//! Chatbot test endpoint client.

use crate::config::ChatbotConfig;
use crate::error::SourceResult;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{error, info};

/// Something that answers a customer message.
///
/// Responders never fail: problems are reported in-band as the reply text,
/// so a broken endpoint shows up in the transcript and gets scored as such.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Reply to one customer message.
    async fn respond(&self, user_message: &str) -> String;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatbotRequest<'a> {
    user_message: &'a str,
    purchase_confirmation_number: &'a str,
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

/// Client for the chatbot's test-response endpoint.
#[derive(Debug, Clone)]
pub struct ChatbotClient {
    config: ChatbotConfig,
    client: Client,
}

impl ChatbotClient {
    /// Create a client.
    ///
    /// Fails if the HTTP client cannot be built with the configured timeout.
    pub fn new(config: ChatbotConfig) -> SourceResult<Self> {
        Ok(Self {
            client: config.build_client()?,
            config,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> SourceResult<Self> {
        Self::new(ChatbotConfig::from_env())
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ChatbotConfig {
        &self.config
    }
}

#[async_trait]
impl Responder for ChatbotClient {
    async fn respond(&self, user_message: &str) -> String {
        info!(prompt = %preview(user_message), "sending message to chatbot");

        let request = ChatbotRequest {
            user_message,
            purchase_confirmation_number: &self.config.confirmation_number,
        };
        let response = match self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.jwt_secret)
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "chatbot request failed");
                return format!("Error: {e}");
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "chatbot returned an error");
            return format!("Error: {}", status.as_u16());
        }

        match response.json::<serde_json::Value>().await {
            Ok(data) => {
                let text = data
                    .get("text")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                info!(reply = %preview(&text), "chatbot replied");
                text
            }
            Err(e) => {
                error!(error = %e, "chatbot reply was not JSON");
                format!("Error parsing response: {e}")
            }
        }
    }
}
