//! Conversations and batches.
//!
//! [`assemble`] is the only way to build a [`Conversation`] from turns. Both
//! the live-fetch path and the report parser go through it, so the stored
//! turn order is reversed exactly once whatever the source.

use crate::identifier::ConversationId;
use crate::transcript::Turn;
use serde::{Deserialize, Serialize};

/// Persona label attached to every assembled conversation.
pub const SUPPORT_AGENT_ROLE: &str = "Gametime Support Agent";

/// An ordered sequence of turns with an id and the agent's role label.
///
/// Turns are stored most-recent-first. Conversations are immutable once
/// assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    role_label: String,
    turns: Vec<Turn>,
}

impl Conversation {
    /// Conversation id. Reports do not persist it, so parsed conversations
    /// carry the placeholder.
    #[must_use]
    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// The agent persona.
    #[must_use]
    pub fn role_label(&self) -> &str {
        &self.role_label
    }

    /// Turns in stored (most-recent-first) order.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the conversation has no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Return a copy carrying a different id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ConversationId>) -> Self {
        self.id = id.into();
        self
    }
}

/// Wrap chronologically ordered turns into a conversation.
///
/// The stored order is the reverse of `turns`. An empty input yields a valid
/// zero-turn conversation; filtering those out is up to the caller.
///
/// ```rust
/// use convo_eval_core::{assemble, Turn};
///
/// let convo = assemble(
///     vec![Turn::new("a", "1"), Turn::new("b", "2"), Turn::new("c", "3")],
///     "c1",
/// );
/// let inputs: Vec<_> = convo.turns().iter().map(|t| t.customer_input.as_str()).collect();
/// assert_eq!(inputs, ["c", "b", "a"]);
/// ```
#[must_use]
pub fn assemble(
    turns: impl IntoIterator<Item = Turn>,
    conversation_id: impl Into<ConversationId>,
) -> Conversation {
    let mut turns: Vec<Turn> = turns.into_iter().collect();
    turns.reverse();
    Conversation {
        id: conversation_id.into(),
        role_label: SUPPORT_AGENT_ROLE.to_string(),
        turns,
    }
}

/// An ordered list of conversations: the unit scored and the unit written to
/// a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationBatch {
    conversations: Vec<Conversation>,
}

impl ConversationBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a conversation at the end.
    pub fn push(&mut self, conversation: Conversation) {
        self.conversations.push(conversation);
    }

    /// Builder-style [`push`](Self::push).
    #[must_use]
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.push(conversation);
        self
    }

    /// Number of conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Total turns across all conversations.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.conversations.iter().map(Conversation::len).sum()
    }

    /// Iterate in batch order.
    pub fn iter(&self) -> std::slice::Iter<'_, Conversation> {
        self.conversations.iter()
    }

    /// View as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Consume into the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<Conversation> {
        self.conversations
    }
}

impl From<Vec<Conversation>> for ConversationBatch {
    fn from(conversations: Vec<Conversation>) -> Self {
        Self { conversations }
    }
}

impl FromIterator<Conversation> for ConversationBatch {
    fn from_iter<I: IntoIterator<Item = Conversation>>(iter: I) -> Self {
        Self {
            conversations: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ConversationBatch {
    type Item = Conversation;
    type IntoIter = std::vec::IntoIter<Conversation>;

    fn into_iter(self) -> Self::IntoIter {
        self.conversations.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConversationBatch {
    type Item = &'a Conversation;
    type IntoIter = std::slice::Iter<'a, Conversation>;

    fn into_iter(self) -> Self::IntoIter {
        self.conversations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::SIMULATED_CONVERSATION_ID;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn turns(n: usize) -> Vec<Turn> {
        (1..=n)
            .map(|i| Turn::new(format!("q{i}"), format!("a{i}")))
            .collect()
    }

    #[test]
    fn test_assemble_reverses() {
        let convo = assemble(turns(3), "c1");
        assert_eq!(
            convo.turns(),
            &[
                Turn::new("q3", "a3"),
                Turn::new("q2", "a2"),
                Turn::new("q1", "a1"),
            ]
        );
        assert_eq!(convo.id().as_str(), "c1");
        assert_eq!(convo.role_label(), SUPPORT_AGENT_ROLE);
    }

    #[test]
    fn test_assemble_empty() {
        let convo = assemble(Vec::new(), SIMULATED_CONVERSATION_ID);
        assert!(convo.is_empty());
        assert!(convo.id().is_placeholder());
    }

    #[test]
    fn test_with_id_keeps_turns() {
        let convo = assemble(turns(2), "simulated").with_id("real-id");
        assert_eq!(convo.id().as_str(), "real-id");
        assert_eq!(convo.len(), 2);
    }

    #[test]
    fn test_batch_collect_and_count() {
        let batch: ConversationBatch = [assemble(turns(2), "a"), assemble(turns(3), "b")]
            .into_iter()
            .collect();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.turn_count(), 5);
        let ids: Vec<_> = batch.iter().map(|c| c.id().to_string()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_conversation_serde() {
        let convo = assemble(turns(1), "c9");
        let json = serde_json::to_value(&convo).unwrap();
        assert_eq!(json["id"], "c9");
        assert_eq!(json["role_label"], SUPPORT_AGENT_ROLE);
        assert_eq!(json["turns"][0]["customer_input"], "q1");
        let back: Conversation = serde_json::from_value(json).unwrap();
        assert_eq!(back, convo);
    }

    proptest! {
        #[test]
        fn prop_assemble_twice_restores_order(n in 0usize..30) {
            let once = assemble(turns(n), "x");
            let twice = assemble(once.turns().to_vec(), "x");
            let expected = turns(n);
            prop_assert_eq!(twice.turns(), expected.as_slice());
        }
    }
}
