//! Directional messages from a conversation feed.
//!
//! A [`Message`] is the raw unit the ticketing system hands us: who sent it
//! and what it said. Its position in the feed is its index in the slice it
//! arrives in; nothing here reorders messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the conversation sent a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sent by the customer.
    Inbound,
    /// Sent by the support agent.
    Outbound,
    /// Missing or unrecognised direction. Never takes part in a turn.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Direction {
    /// Check if this is a customer message.
    #[must_use]
    pub fn is_inbound(self) -> bool {
        matches!(self, Self::Inbound)
    }

    /// Check if this is an agent message.
    #[must_use]
    pub fn is_outbound(self) -> bool {
        matches!(self, Self::Outbound)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => write!(f, "inbound"),
            Self::Outbound => write!(f, "outbound"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A single message in a conversation feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent the message.
    #[serde(default)]
    pub direction: Direction,
    /// The message text.
    #[serde(default)]
    pub text: String,
}

impl Message {
    /// Create a new message.
    #[must_use]
    pub fn new(direction: Direction, text: impl Into<String>) -> Self {
        Self {
            direction,
            text: text.into(),
        }
    }

    /// Create a customer message.
    #[must_use]
    pub fn inbound(text: impl Into<String>) -> Self {
        Self::new(Direction::Inbound, text)
    }

    /// Create an agent message.
    #[must_use]
    pub fn outbound(text: impl Into<String>) -> Self {
        Self::new(Direction::Outbound, text)
    }

    /// Create a message with no usable direction.
    #[must_use]
    pub fn unknown(text: impl Into<String>) -> Self {
        Self::new(Direction::Unknown, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert!(Message::inbound("hi").direction.is_inbound());
        assert!(Message::outbound("hello").direction.is_outbound());
        let noise = Message::unknown("system note");
        assert!(!noise.direction.is_inbound());
        assert!(!noise.direction.is_outbound());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Inbound.to_string(), "inbound");
        assert_eq!(Direction::Outbound.to_string(), "outbound");
    }

    #[test]
    fn test_deserialize_unrecognised_direction() {
        let msg: Message =
            serde_json::from_str(r#"{"direction": "note", "text": "merged"}"#).unwrap();
        assert_eq!(msg.direction, Direction::Unknown);
    }

    #[test]
    fn test_deserialize_missing_direction() {
        let msg: Message = serde_json::from_str(r#"{"text": "assigned to queue"}"#).unwrap();
        assert_eq!(msg, Message::unknown("assigned to queue"));
        assert_eq!(Direction::default(), Direction::Unknown);
    }

    #[test]
    fn test_deserialize_missing_text() {
        let msg: Message = serde_json::from_str(r#"{"direction": "outbound"}"#).unwrap();
        assert_eq!(msg, Message::outbound(""));
    }
}
