//! Conversation identifiers.
//!
//! Conversations pulled from the ticketing system carry the id that system
//! assigned. Conversations rebuilt from a tabular report or produced by the
//! simulator have no such id, so they get a placeholder or a generated one.

use uuid::Uuid;

/// Placeholder id for conversations whose origin id is unknown.
///
/// The tabular report has no id column, so every conversation parsed back
/// from a report carries this value.
pub const SIMULATED_CONVERSATION_ID: &str = "simulated";

/// Generate a unique id for a simulated conversation.
///
/// Returns a UUID v4 string prefixed with "sim_".
///
/// # Example
///
/// ```rust
/// use convo_eval_core::identifier::generate_simulated_id;
///
/// let id = generate_simulated_id();
/// assert!(id.starts_with("sim_"));
/// assert_eq!(id.len(), 36); // "sim_" + 32 hex chars
/// ```
#[must_use]
pub fn generate_simulated_id() -> String {
    format!("sim_{}", Uuid::new_v4().simple())
}

/// Type-safe wrapper for a conversation ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Create from an existing string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The placeholder id used for conversations rebuilt from a report.
    #[must_use]
    pub fn simulated() -> Self {
        Self(SIMULATED_CONVERSATION_ID.to_string())
    }

    /// A fresh, unique id for a generated conversation.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_simulated_id())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the report placeholder id.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0 == SIMULATED_CONVERSATION_ID
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ConversationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
