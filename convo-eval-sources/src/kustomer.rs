//! Kustomer conversation fetcher.
//!
//! Two calls: a customer search that lists conversation ids, and a per
//! conversation message listing. Both are best effort. The
//! [`MessageSource`] methods log failures and return an empty list, so a
//! flaky API shrinks the nightly batch instead of aborting it.

use crate::config::KustomerConfig;
use crate::error::{SourceError, SourceResult};
use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use convo_eval_core::{Direction, Message};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default number of conversations requested per search.
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

/// Time zone the search interprets dates in.
pub const SEARCH_TIME_ZONE: &str = "America/Los_Angeles";

/// Which conversations to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    /// Only conversations assigned to this user.
    pub assigned_user_id: Option<String>,
    /// Only conversations in this queue.
    pub queue_id: Option<String>,
    /// Only conversations created on or before this date.
    pub created_on_or_before: NaiveDate,
    /// Maximum number of conversations.
    pub limit: usize,
}

impl SearchFilter {
    /// Conversations created up to a given date.
    #[must_use]
    pub fn up_to(date: NaiveDate) -> Self {
        Self {
            assigned_user_id: None,
            queue_id: None,
            created_on_or_before: date,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Conversations created up to yesterday, local time.
    #[must_use]
    pub fn yesterday() -> Self {
        let today = Local::now().date_naive();
        Self::up_to(today.checked_sub_days(Days::new(1)).unwrap_or(today))
    }

    /// Take the user and queue filters from a config.
    #[must_use]
    pub fn for_config(mut self, config: &KustomerConfig) -> Self {
        self.assigned_user_id = config.assigned_user_id.clone();
        self.queue_id = config.queue_id.clone();
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

    /// Set the limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Search request body.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        let mut and = Vec::new();
        if let Some(user) = &self.assigned_user_id {
            and.push(serde_json::json!({ "conversation_assigned_users": { "equals": user } }));
        }
        if let Some(queue) = &self.queue_id {
            and.push(serde_json::json!({ "conversation_queue": { "equals": queue } }));
        }
        and.push(serde_json::json!({
            "conversation_created_at": {
                "lte": self.created_on_or_before.format("%Y-%m-%d").to_string()
            }
        }));

        serde_json::json!({
            "and": and,
            "or": [],
            "fields": [],
            "queryContext": "conversation",
            "sort": [{ "conversation_created_at": "desc" }],
            "timeZone": SEARCH_TIME_ZONE,
            "limit": self.limit,
        })
    }
}

/// A conversation found by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRef {
    /// Kustomer conversation id.
    pub id: String,
}

/// Where conversations and their messages come from.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// List conversations matching a filter. Failures yield an empty list.
    async fn list_conversations(&self, filter: &SearchFilter) -> Vec<ConversationRef>;

    /// Fetch a conversation's messages in feed order. Failures yield an
    /// empty list.
    async fn fetch_messages(&self, conversation_id: &str) -> Vec<Message>;
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageEntry {
    #[serde(default)]
    attributes: MessageAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct MessageAttributes {
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    preview: Option<String>,
}

impl From<MessageAttributes> for Message {
    fn from(attributes: MessageAttributes) -> Self {
        let direction = match attributes.direction.as_deref() {
            Some("in") => Direction::Inbound,
            Some("out") => Direction::Outbound,
            _ => Direction::Unknown,
        };
        Message::new(direction, attributes.preview.unwrap_or_default())
    }
}

/// Kustomer REST client.
#[derive(Debug, Clone)]
pub struct KustomerClient {
    config: KustomerConfig,
    client: Client,
}

impl KustomerClient {
    /// Create a client.
    ///
    /// Fails if the HTTP client cannot be built with the configured timeout.
    pub fn new(config: KustomerConfig) -> SourceResult<Self> {
        Ok(Self {
            client: config.build_client()?,
            config,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> SourceResult<Self> {
        Self::new(KustomerConfig::from_env()?)
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &KustomerConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn read_data<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> SourceResult<Vec<T>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::api(status.as_u16(), body));
        }
        let bytes = response.bytes().await?;
        let envelope: DataEnvelope<T> =
            serde_json::from_slice(&bytes).map_err(|e| SourceError::decode(e.to_string()))?;
        Ok(envelope.data)
    }

    /// Search for conversations, surfacing errors.
    pub async fn try_search_conversations(
        &self,
        filter: &SearchFilter,
    ) -> SourceResult<Vec<ConversationRef>> {
        let response = self
            .client
            .post(self.url("/customers/search"))
            .bearer_auth(&self.config.api_key)
            .json(&filter.to_payload())
            .send()
            .await?;

        let entries: Vec<SearchEntry> = Self::read_data(response).await?;
        let found = entries.len();
        let refs: Vec<_> = entries
            .into_iter()
            .filter_map(|entry| entry.id.filter(|id| !id.is_empty()))
            .map(|id| ConversationRef { id })
            .collect();

        if refs.len() < found {
            debug!(skipped = found - refs.len(), "search entries without an id");
        }
        Ok(refs)
    }

    /// Fetch a conversation's messages, surfacing errors.
    pub async fn try_fetch_messages(&self, conversation_id: &str) -> SourceResult<Vec<Message>> {
        let response = self
            .client
            .get(self.url(&format!("/conversations/{conversation_id}/messages")))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let entries: Vec<MessageEntry> = Self::read_data(response).await?;
        Ok(entries.into_iter().map(|e| e.attributes.into()).collect())
    }
}

#[async_trait]
impl MessageSource for KustomerClient {
    async fn list_conversations(&self, filter: &SearchFilter) -> Vec<ConversationRef> {
        match self.try_search_conversations(filter).await {
            Ok(refs) => {
                debug!(count = refs.len(), "listed conversations");
                refs
            }
            Err(e) => {
                warn!(error = %e, "conversation search failed");
                Vec::new()
            }
        }
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Vec<Message> {
        match self.try_fetch_messages(conversation_id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(conversation = conversation_id, error = %e, "message fetch failed");
                Vec::new()
            }
        }
    }
}
