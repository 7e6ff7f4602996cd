//! Criteria-based metrics graded by an LLM judge.

use crate::error::{EvalError, EvalResult};
use crate::evaluator::{Metric, MetricScore};
use crate::judge::Judge;
use async_trait::async_trait;
use convo_eval_core::Conversation;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Highest score the judge is asked to give.
pub const JUDGE_SCALE: f64 = 10.0;

/// A named list of evaluation steps with a pass threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    /// Metric name.
    pub name: String,
    /// Steps the judge follows, in order.
    pub evaluation_steps: Vec<String>,
    /// Minimum passing score in `0.0..=1.0`.
    pub threshold: f64,
}

impl Rubric {
    /// Create a rubric.
    pub fn new(
        name: impl Into<String>,
        steps: impl IntoIterator<Item = impl Into<String>>,
        threshold: f64,
    ) -> Self {
        Self {
            name: name.into(),
            evaluation_steps: steps.into_iter().map(Into::into).collect(),
            threshold,
        }
    }

    /// Set the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Load a list of rubrics from a YAML file.
    pub fn load_all(path: impl AsRef<Path>) -> EvalResult<Vec<Self>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parse a list of rubrics from YAML.
    pub fn from_yaml_str(content: &str) -> EvalResult<Vec<Self>> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build the grading prompt for a conversation.
    ///
    /// Turns appear in stored order, each labelled with its position.
    #[must_use]
    pub fn prompt(&self, conversation: &Conversation) -> String {
        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "Evaluate the following conversation between a customer and the {} against the criteria \"{}\".",
            conversation.role_label(),
            self.name
        );
        prompt.push_str("\nEvaluation steps:\n");
        for (i, step) in self.evaluation_steps.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {}", i + 1, step);
        }
        prompt.push_str("\nConversation:\n");
        for (i, turn) in conversation.turns().iter().enumerate() {
            let _ = writeln!(prompt, "Turn {}", i + 1);
            let _ = writeln!(prompt, "Customer: {}", turn.customer_input);
            let _ = writeln!(prompt, "{}: {}", conversation.role_label(), turn.agent_output);
        }
        let _ = write!(
            prompt,
            "\nRespond with a JSON object {{\"score\": <integer 0-{}>, \"reason\": \"<explanation>\"}}.",
            JUDGE_SCALE
        );
        prompt
    }
}

/// Judge reply body.
#[derive(Debug, Deserialize)]
struct Verdict {
    score: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
}

/// A [`Metric`] that asks a [`Judge`] to grade a conversation against a
/// [`Rubric`].
#[derive(Clone)]
pub struct RubricMetric {
    rubric: Rubric,
    judge: Arc<dyn Judge>,
}

impl RubricMetric {
    /// Create a rubric metric.
    pub fn new(rubric: Rubric, judge: Arc<dyn Judge>) -> Self {
        Self { rubric, judge }
    }

    /// The rubric.
    #[must_use]
    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }
}

impl std::fmt::Debug for RubricMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RubricMetric")
            .field("rubric", &self.rubric.name)
            .field("judge", &self.judge.model_name())
            .finish()
    }
}

#[async_trait]
impl Metric for RubricMetric {
    fn name(&self) -> &str {
        &self.rubric.name
    }

    fn threshold(&self) -> f64 {
        self.rubric.threshold
    }

    async fn measure(&self, conversation: &Conversation) -> EvalResult<MetricScore> {
        let response = self.judge.judge(self.rubric.prompt(conversation)).await?;

        let verdict: Verdict = serde_json::from_str(&response.content).map_err(|e| {
            EvalError::judge(format!("{}: unparseable verdict: {e}", self.rubric.name))
        })?;
        let raw = verdict
            .score
            .ok_or_else(|| EvalError::judge(format!("{}: verdict has no score", self.rubric.name)))?;

        let score = (raw / JUDGE_SCALE).clamp(0.0, 1.0);
        let cost = response.usage.calculate_cost(&self.judge.pricing());
        debug!(metric = %self.rubric.name, raw, score, cost, "rubric graded");

        let mut result = MetricScore::new(score).with_cost(cost);
        if let Some(reason) = verdict.reason {
            result = result.with_reason(reason);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::{JudgeResponse, Pricing, TokenUsage};
    use convo_eval_core::{assemble, Turn};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct CannedJudge {
        content: String,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedJudge {
        fn new(content: &str) -> Arc<Self> {
            Arc::new(Self {
                content: content.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Judge for CannedJudge {
        async fn judge(&self, prompt: String) -> EvalResult<JudgeResponse> {
            self.prompts.lock().unwrap().push(prompt);
            Ok(JudgeResponse {
                content: self.content.clone(),
                usage: TokenUsage::new(1000, 100),
                model: "canned".to_string(),
            })
        }

        fn model_name(&self) -> &str {
            "canned"
        }

        fn pricing(&self) -> Pricing {
            Pricing::per_million(1.0, 10.0)
        }
    }

    fn rubric() -> Rubric {
        Rubric::new("Politeness", ["Check greetings.", "Check tone."], 0.7)
    }

    fn conversation() -> Conversation {
        assemble(
            vec![Turn::new("hi", "Hello!"), Turn::new("thanks", "You're welcome.")],
            "c1",
        )
    }

    #[test]
    fn test_prompt_lists_steps_and_stored_order() {
        let prompt = rubric().prompt(&conversation());

        assert!(prompt.contains("\"Politeness\""));
        assert!(prompt.contains("1. Check greetings.\n2. Check tone."));
        let newest = prompt.find("Customer: thanks").unwrap();
        let oldest = prompt.find("Customer: hi").unwrap();
        assert!(newest < oldest);
        assert!(prompt.contains("Gametime Support Agent: You're welcome."));
    }

    #[tokio::test]
    async fn test_measure_normalises_score_and_costs_usage() {
        let judge = CannedJudge::new(r#"{"score": 8, "reason": "polite throughout"}"#);
        let metric = RubricMetric::new(rubric(), judge.clone());

        let score = metric.measure(&conversation()).await.unwrap();

        assert!((score.score - 0.8).abs() < 1e-9);
        assert_eq!(score.reason.as_deref(), Some("polite throughout"));
        let cost = score.evaluation_cost.unwrap();
        assert!((cost - 0.002).abs() < 1e-9);
        assert_eq!(judge.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_measure_clamps_out_of_range_scores() {
        let metric = RubricMetric::new(rubric(), CannedJudge::new(r#"{"score": 14}"#));
        let score = metric.measure(&conversation()).await.unwrap();
        assert_eq!(score.score, 1.0);
        assert_eq!(score.reason, None);
    }

    #[tokio::test]
    async fn test_missing_score_is_judge_error() {
        let metric = RubricMetric::new(rubric(), CannedJudge::new(r#"{"reason": "?"}"#));
        let err = metric.measure(&conversation()).await.unwrap_err();
        assert!(matches!(err, EvalError::Judge(_)));
    }

    #[tokio::test]
    async fn test_non_json_verdict_is_judge_error() {
        let metric = RubricMetric::new(rubric(), CannedJudge::new("eight out of ten"));
        let err = metric.measure(&conversation()).await.unwrap_err();
        assert!(err.to_string().contains("Politeness"));
    }

    #[test]
    fn test_rubrics_from_yaml() {
        let yaml = r#"
- name: Brevity
  threshold: 0.5
  evaluation_steps:
    - Replies stay under three sentences.
"#;
        let rubrics = Rubric::from_yaml_str(yaml).unwrap();
        assert_eq!(
            rubrics,
            vec![Rubric::new("Brevity", ["Replies stay under three sentences."], 0.5)]
        );
    }
}
