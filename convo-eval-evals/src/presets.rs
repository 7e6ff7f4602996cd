//! Stock rubrics for support-chatbot conversations.

use crate::error::EvalResult;
use crate::evaluator::{BoxedMetric, Metric};
use crate::judge::Judge;
use crate::rubric::{Rubric, RubricMetric};
use crate::scorers::{turn_metric, ContainsMetric, LengthMetric, NotContainsMetric, RegexMetric};
use std::sync::Arc;

/// Does the bot stay on-topic, decline out-of-scope requests, and answer
/// business questions clearly.
#[must_use]
pub fn correctness_rubric() -> Rubric {
    Rubric::new(
        "Correctness",
        [
            "Turns will alternate between a customer message and achatbot response.",
            "Determine if the user's query is related to the company's platform and services. If not, the chatbot should politely decline to assist.",
            "Evaluate whether the chatbot maintains appropriate boundaries - it should decline requests for: poems, rhymes, homework help, coding assistance, or any non-business related queries.",
            "Assess if the chatbot's responses are professional, clear, and directly address the user's legitimate business inquiries.",
            "Ensure the chatbot provides clear instructions and next steps when authentication is required.",
            "Determine if the chatbot successfully identifies and rejects attempts to: generate creative content, solve academic problems, or assist with coding.",
            "Verify that the chatbot maintains professional boundaries and does not engage in casual conversation or entertainment.",
            "Evaluate the clarity and professionalism of the chatbot's language and tone.",
            "Assess whether the chatbot provides complete and accurate information for legitimate business queries.",
            "Verify that the chatbot offers appropriate alternatives or next steps when it cannot fulfill a request.",
            "Provide a detailed reasoning for the evaluation, highlighting both successful aspects and areas of concern. Make sure to consider the full conversation flow and context.",
            "Score the response based on: functional correctness (50%), and response quality (50%).",
        ],
        0.85,
    )
}

/// Does the bot run the phone-number / verification-code flow when, and only
/// when, account-specific information is requested.
#[must_use]
pub fn verification_rubric() -> Rubric {
    Rubric::new(
        "Verification",
        [
            "Turns will alternate between a customer message and achatbot response.",
            "Verification is required when the user asks about:",
            "- Ticket delivery status or timing",
            "- Purchase details or order status",
            "- Account-specific information",
            "- Ticket transfers or resale options",
            "- Payment issues",
            "Verification is NOT required for:",
            "- General questions about the platform",
            "- How to use the app",
            "- General policies or procedures relating to Gametime's platform",
            "- Non-account specific information",
            "- User's that drop off of the conversation before asking quesitons requiring verification.",
            "The verification flow will follow these steps in order:",
            "1. Chatbot initiates by asking the user for their phone number (must include 'phone number' in response)",
            "2. User provides phone number (typically 10 digits, may include formatting)",
            "3. Chatbot confirms sending verification code (must mention 'verification code')",
            "4. User provides 6-digit verification code to complete the process.",
            "Additional requirements:",
            "- The verification flow is usually completed in 3 turns",
            "- The chatbot must not reveal sensitive account information before verification code is sent",
            "- The chatbot should handle failed verification attempts gracefully",
            "- The chatbot should not ask for verification multiple times in the same conversation",
            "Score based on:",
            "- Proper identification of when verification is needed (30%)",
            "- Correct execution of the verification flow (40%)",
            "- Appropriate handling of verification failures (20%)",
            "- Maintaining security by not revealing sensitive info before verification (10%)",
            "Provide a detailed reasoning for the evaluation, highlighting both successful aspects and areas of concern.",
        ],
        0.7,
    )
}

/// The stock rubrics, in report order.
#[must_use]
pub fn default_rubrics() -> Vec<Rubric> {
    vec![correctness_rubric(), verification_rubric()]
}

/// Wrap rubrics as metrics sharing one judge.
pub fn rubric_metrics(
    rubrics: impl IntoIterator<Item = Rubric>,
    judge: Arc<dyn Judge>,
) -> Vec<BoxedMetric> {
    rubrics
        .into_iter()
        .map(|rubric| Arc::new(RubricMetric::new(rubric, judge.clone())) as BoxedMetric)
        .collect()
}

/// Every reply is non-empty and is not a relayed endpoint error.
#[must_use]
pub fn answered_metric() -> impl Metric {
    turn_metric("Answered", 1.0, |turn| {
        let reply = turn.agent_output.trim();
        !reply.is_empty() && !reply.starts_with("Error")
    })
}

/// Deterministic checks run on every agent reply, next to or instead of the
/// judged rubrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyChecks {
    /// Text every reply must contain (case-insensitive).
    pub require: Vec<String>,
    /// Text no reply may contain (case-insensitive).
    pub forbid: Vec<String>,
    /// Regex every reply must match.
    pub pattern: Option<String>,
    /// Upper bound on reply length in words.
    pub max_words: Option<usize>,
    /// Whether replies must be non-empty and error-free.
    pub answered: bool,
}

impl ReplyChecks {
    /// No checks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a phrase in every reply.
    #[must_use]
    pub fn require(mut self, text: impl Into<String>) -> Self {
        self.require.push(text.into());
        self
    }

    /// Forbid a phrase in every reply.
    #[must_use]
    pub fn forbid(mut self, text: impl Into<String>) -> Self {
        self.forbid.push(text.into());
        self
    }

    /// Require every reply to match a regex.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Cap reply length in words.
    #[must_use]
    pub fn max_words(mut self, max: usize) -> Self {
        self.max_words = Some(max);
        self
    }

    /// Require answered, error-free replies.
    #[must_use]
    pub fn answered(mut self) -> Self {
        self.answered = true;
        self
    }

    /// Whether no check is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.require.is_empty()
            && self.forbid.is_empty()
            && self.pattern.is_none()
            && self.max_words.is_none()
            && !self.answered
    }

    /// Build the configured checks as metrics.
    ///
    /// Fails if the pattern is not a valid regex.
    pub fn metrics(&self) -> EvalResult<Vec<BoxedMetric>> {
        let mut metrics: Vec<BoxedMetric> = Vec::new();
        if self.answered {
            metrics.push(Arc::new(answered_metric()));
        }
        for text in &self.require {
            metrics.push(Arc::new(ContainsMetric::new(text.clone()).ignore_case()));
        }
        for text in &self.forbid {
            metrics.push(Arc::new(NotContainsMetric::new(text.clone()).ignore_case()));
        }
        if let Some(pattern) = &self.pattern {
            metrics.push(Arc::new(RegexMetric::new(pattern)?));
        }
        if let Some(max) = self.max_words {
            metrics.push(Arc::new(LengthMetric::new().words().max(max)));
        }
        Ok(metrics)
    }
}
