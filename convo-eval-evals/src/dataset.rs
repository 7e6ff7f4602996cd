//! Conversation datasets.
//!
//! A dataset is a named batch saved as JSON or YAML. Unlike the tabular
//! report it keeps conversation ids and the agent role label.

use crate::error::EvalResult;
use convo_eval_core::{Conversation, ConversationBatch};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named collection of conversations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationDataset {
    /// Dataset name.
    #[serde(default)]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Conversations, in batch order.
    pub conversations: ConversationBatch,
}

impl ConversationDataset {
    /// Create an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing batch.
    #[must_use]
    pub fn from_batch(batch: ConversationBatch) -> Self {
        Self {
            conversations: batch,
            ..Self::default()
        }
    }

    /// Set the dataset name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Add a conversation.
    #[must_use]
    pub fn conversation(mut self, conversation: Conversation) -> Self {
        self.conversations.push(conversation);
        self
    }

    /// Get the number of conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Take the first `n` conversations.
    #[must_use]
    pub fn take(&self, n: usize) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            conversations: self.conversations.iter().take(n).cloned().collect(),
        }
    }

    /// Unwrap into the batch.
    #[must_use]
    pub fn into_batch(self) -> ConversationBatch {
        self.conversations
    }

    /// Load from JSON file.
    pub fn from_json(path: impl AsRef<Path>) -> EvalResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Load from JSON string.
    pub fn from_json_str(content: &str) -> EvalResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load from YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> EvalResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Load from YAML string.
    pub fn from_yaml_str(content: &str) -> EvalResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from a file, picking the format by extension (`.yaml`/`.yml`,
    /// anything else is JSON).
    pub fn load(path: impl AsRef<Path>) -> EvalResult<Self> {
        let path = path.as_ref();
        if is_yaml(path) {
            Self::from_yaml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Save to JSON file.
    pub fn to_json(&self, path: impl AsRef<Path>) -> EvalResult<()> {
        std::fs::write(path.as_ref(), self.to_json_string()?)?;
        Ok(())
    }

    /// Serialize to JSON string.
    pub fn to_json_string(&self) -> EvalResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save to YAML file.
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> EvalResult<()> {
        std::fs::write(path.as_ref(), self.to_yaml_string()?)?;
        Ok(())
    }

    /// Serialize to YAML string.
    pub fn to_yaml_string(&self) -> EvalResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl From<ConversationBatch> for ConversationDataset {
    fn from(batch: ConversationBatch) -> Self {
        Self::from_batch(batch)
    }
}

pub(crate) fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}
