//! Turn pairing.
//!
//! Support feeds are noisy: system notes, double-sends from the customer,
//! agent messages sent before the customer said anything. [`pair`] walks the
//! feed once and keeps only the exchanges where a customer message is
//! immediately answered by an agent message. Everything else is dropped.
//!
//! Dropping is lossy by construction. An inbound message at the end of the
//! feed with no reply yet is discarded, not held back for a later fetch.

use crate::message::{Direction, Message};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One customer-input / agent-output exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    /// What the customer said.
    pub customer_input: String,
    /// What the agent replied.
    pub agent_output: String,
}

impl Turn {
    /// Create a new turn.
    #[must_use]
    pub fn new(customer_input: impl Into<String>, agent_output: impl Into<String>) -> Self {
        Self {
            customer_input: customer_input.into(),
            agent_output: agent_output.into(),
        }
    }
}

/// Scan state: either nothing pending, or an inbound message waiting for the
/// very next message to be its reply.
#[derive(Debug, Clone, Copy)]
enum Scan<'a> {
    Idle,
    AwaitingReply(&'a Message),
}

/// Pair an ordered message feed into turns.
///
/// An inbound message followed immediately by an outbound message becomes a
/// [`Turn`]; both are consumed. Any other message is skipped. This is greedy
/// and never backtracks, so the result depends only on adjacency:
///
/// ```rust
/// use convo_eval_core::{pair, Message, Turn};
///
/// let turns = pair(&[
///     Message::inbound("hi"),
///     Message::outbound("hello"),
///     Message::inbound("bye"),
/// ]);
/// assert_eq!(turns, vec![Turn::new("hi", "hello")]);
/// ```
#[must_use]
pub fn pair(messages: &[Message]) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(messages.len() / 2);
    let mut state = Scan::Idle;

    for message in messages {
        state = match (state, message.direction) {
            (Scan::AwaitingReply(inbound), Direction::Outbound) => {
                turns.push(Turn::new(&inbound.text, &message.text));
                Scan::Idle
            }
            // A newer inbound message replaces an unanswered one.
            (_, Direction::Inbound) => Scan::AwaitingReply(message),
            _ => Scan::Idle,
        };
    }

    let dropped = messages.len() - turns.len() * 2;
    if dropped > 0 {
        debug!(
            messages = messages.len(),
            turns = turns.len(),
            dropped,
            "dropped unpaired messages"
        );
    }

    turns
}
