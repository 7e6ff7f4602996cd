//! Scripted conversation simulator.
//!
//! Plays a fixed list of customer messages against a [`Responder`] and
//! records the exchange as a message feed. The feed then goes through the
//! same pairing and assembly as a fetched one.

use crate::chatbot::Responder;
use crate::error::SourceResult;
use convo_eval_core::{assemble, pair, Conversation, ConversationBatch, ConversationId, Message};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A customer persona's messages, sent in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationScript {
    /// Script name, for logs.
    pub name: String,
    /// Customer messages.
    pub messages: Vec<String>,
}

impl ConversationScript {
    /// Create a script.
    pub fn new(
        name: impl Into<String>,
        messages: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }

    /// Load scripts from a file, YAML for `.yaml`/`.yml` and JSON otherwise.
    pub fn load_all(path: impl AsRef<Path>) -> SourceResult<Vec<Self>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        if yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parse scripts from JSON.
    pub fn from_json_str(content: &str) -> SourceResult<Vec<Self>> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse scripts from YAML.
    pub fn from_yaml_str(content: &str) -> SourceResult<Vec<Self>> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// The stock customer intents: a lost-tickets case, a cancellation, and an
/// out-of-scope request.
#[must_use]
pub fn default_scripts() -> Vec<ConversationScript> {
    vec![
        ConversationScript::new(
            "missing tickets",
            [
                "I can't find my tickets",
                "My phone number is 415-555-0134",
                "The code is 123456",
            ],
        ),
        ConversationScript::new(
            "cancel order",
            ["I need to cancel my order", "Can I get a refund instead?"],
        ),
        ConversationScript::new(
            "homework",
            ["I need help with my homework", "Just write me a short poem then"],
        ),
    ]
}

/// Plays scripts against a responder.
#[derive(Clone)]
pub struct ScriptedSimulator {
    responder: Arc<dyn Responder>,
}

impl ScriptedSimulator {
    /// Create a simulator.
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        Self { responder }
    }

    /// Play one script and return the raw feed, customer and agent messages
    /// interleaved.
    pub async fn play(&self, script: &ConversationScript) -> Vec<Message> {
        let mut feed = Vec::with_capacity(script.messages.len() * 2);
        for text in &script.messages {
            let reply = self.responder.respond(text).await;
            feed.push(Message::inbound(text.as_str()));
            feed.push(Message::outbound(reply));
        }
        feed
    }

    /// Play one script into a conversation with a fresh id.
    pub async fn simulate(&self, script: &ConversationScript) -> Conversation {
        let feed = self.play(script).await;
        let conversation = assemble(pair(&feed), ConversationId::generate());
        info!(
            script = %script.name,
            conversation = %conversation.id(),
            turns = conversation.len(),
            "simulated conversation"
        );
        conversation
    }

    /// Play every script, in order. Scripts that produce no turns are
    /// left out.
    pub async fn simulate_all(&self, scripts: &[ConversationScript]) -> ConversationBatch {
        let mut batch = ConversationBatch::new();
        for script in scripts {
            let conversation = self.simulate(script).await;
            if !conversation.is_empty() {
                batch.push(conversation);
            }
        }
        batch
    }
}

impl std::fmt::Debug for ScriptedSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedSimulator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use convo_eval_core::Turn;
    use pretty_assertions::assert_eq;

    struct Echo;

    #[async_trait]
    impl Responder for Echo {
        async fn respond(&self, user_message: &str) -> String {
            format!("echo: {user_message}")
        }
    }

    fn simulator() -> ScriptedSimulator {
        ScriptedSimulator::new(Arc::new(Echo))
    }

    #[tokio::test]
    async fn test_play_interleaves_feed() {
        let feed = simulator()
            .play(&ConversationScript::new("s", ["a", "b"]))
            .await;
        assert_eq!(
            feed,
            vec![
                Message::inbound("a"),
                Message::outbound("echo: a"),
                Message::inbound("b"),
                Message::outbound("echo: b"),
            ]
        );
    }

    #[tokio::test]
    async fn test_simulate_assembles_most_recent_first() {
        let convo = simulator()
            .simulate(&ConversationScript::new("s", ["a", "b"]))
            .await;

        assert_eq!(
            convo.turns(),
            &[Turn::new("b", "echo: b"), Turn::new("a", "echo: a")]
        );
        assert!(convo.id().as_str().starts_with("sim_"));
    }

    #[tokio::test]
    async fn test_simulate_all_skips_empty_scripts() {
        let scripts = vec![
            ConversationScript::new("empty", Vec::<String>::new()),
            ConversationScript::new("one", ["hi"]),
        ];
        let batch = simulator().simulate_all(&scripts).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.turn_count(), 1);
    }

    #[test]
    fn test_scripts_from_yaml_and_json() {
        let yaml = "- name: refund\n  messages:\n    - I want a refund\n";
        let json = r#"[{"name": "refund", "messages": ["I want a refund"]}]"#;
        let expected = vec![ConversationScript::new("refund", ["I want a refund"])];

        assert_eq!(ConversationScript::from_yaml_str(yaml).unwrap(), expected);
        assert_eq!(ConversationScript::from_json_str(json).unwrap(), expected);
    }

    #[test]
    fn test_load_all_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scripts.yaml");
        std::fs::write(&path, "- name: x\n  messages: [hello]\n").unwrap();

        let scripts = ConversationScript::load_all(&path).unwrap();
        assert_eq!(scripts, vec![ConversationScript::new("x", ["hello"])]);
    }

    #[test]
    fn test_default_scripts() {
        let scripts = default_scripts();
        assert_eq!(scripts.len(), 3);
        assert_eq!(scripts[0].messages[0], "I can't find my tickets");
    }
}
