//! # convo-eval-core
//!
//! Core types and transcript reconstruction for convo-eval.
//!
//! This crate provides the foundational types used throughout the convo-eval workspace:
//!
//! - **Messages**: Directional entries from a support conversation feed
//! - **Transcript**: Greedy pairing of messages into customer/agent turns
//! - **Conversations**: Assembled, immutable turn sequences and batches
//! - **Identifiers**: Type-safe conversation ids, including the report placeholder
//!
//! Everything here is pure and synchronous. Network access, scoring and file
//! output live in the sibling crates.
//!
//! ## Example
//!
//! ```rust
//! use convo_eval_core::{assemble, pair, Message, Turn};
//!
//! let messages = vec![
//!     Message::inbound("Where are my tickets?"),
//!     Message::outbound("Let me check that order for you."),
//!     Message::inbound("Thanks"),
//! ];
//!
//! let turns = pair(&messages);
//! assert_eq!(turns, vec![Turn::new("Where are my tickets?", "Let me check that order for you.")]);
//!
//! let convo = assemble(turns, "5f3c9e");
//! assert_eq!(convo.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod conversation;
pub mod identifier;
pub mod message;
pub mod transcript;

// Re-exports for convenience
pub use conversation::{assemble, Conversation, ConversationBatch, SUPPORT_AGENT_ROLE};
pub use identifier::{ConversationId, SIMULATED_CONVERSATION_ID};
pub use message::{Direction, Message};
pub use transcript::{pair, Turn};

/// Prelude module for common imports.
///
/// ```rust
/// use convo_eval_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::conversation::{assemble, Conversation, ConversationBatch, SUPPORT_AGENT_ROLE};
    pub use crate::identifier::{generate_simulated_id, ConversationId, SIMULATED_CONVERSATION_ID};
    pub use crate::message::{Direction, Message};
    pub use crate::transcript::{pair, Turn};
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fetch_path_end_to_end() {
        let messages = vec![
            Message::inbound("hi"),
            Message::outbound("hello"),
            Message::inbound("bye"),
        ];
        let convo = assemble(pair(&messages), "c1");
        assert_eq!(convo.turns(), &[Turn::new("hi", "hello")]);
        assert_eq!(convo.id().as_str(), "c1");
    }
}
