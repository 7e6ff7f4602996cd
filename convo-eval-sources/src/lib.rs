//! Conversation sources for convo-eval.
//!
//! - **Kustomer** - historical support conversations via the REST API
//! - **Chatbot** - the bot's test-response endpoint, one message at a time
//! - **Simulator** - scripted customers played against a [`Responder`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use convo_eval_sources::{KustomerClient, MessageSource, SearchFilter};
//!
//! let client = KustomerClient::from_env()?;
//! let filter = SearchFilter::yesterday().for_config(client.config());
//! for conversation in client.list_conversations(&filter).await {
//!     let messages = client.fetch_messages(&conversation.id).await;
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod chatbot;
mod config;
mod error;
mod kustomer;
mod simulator;

// Re-exports
pub use chatbot::{ChatbotClient, Responder};
pub use config::{
    ChatbotConfig, KustomerConfig, CHATBOT_TIMEOUT, DEFAULT_CHATBOT_API_URL,
    DEFAULT_CONFIRMATION_NUMBER, DEFAULT_JWT_SECRET, DEFAULT_KUSTOMER_BASE_URL,
};
pub use error::{SourceError, SourceResult};
pub use kustomer::{
    ConversationRef, KustomerClient, MessageSource, SearchFilter, DEFAULT_SEARCH_LIMIT,
    SEARCH_TIME_ZONE,
};
pub use simulator::{default_scripts, ConversationScript, ScriptedSimulator};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ChatbotClient, ChatbotConfig, ConversationScript, KustomerClient, KustomerConfig,
        MessageSource, Responder, ScriptedSimulator, SearchFilter, SourceError, SourceResult,
    };
}
