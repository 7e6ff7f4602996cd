//! Built-in deterministic metrics.
//!
//! Each check runs over the agent's replies. The score is the fraction of
//! turns whose reply passes, so a threshold of `1.0` (the default) means
//! "every reply" and lower thresholds allow some misses.

use crate::error::EvalResult;
use crate::evaluator::{Metric, MetricScore};
use async_trait::async_trait;
use convo_eval_core::{Conversation, Turn};
use regex::Regex;

const DEFAULT_THRESHOLD: f64 = 1.0;

/// Score a conversation by the share of replies satisfying `check`.
///
/// The reason lists the 1-based positions of failing turns. A conversation
/// with no turns scores `0.0`.
fn score_replies(
    conversation: &Conversation,
    what: &str,
    check: impl Fn(&str) -> bool,
) -> MetricScore {
    let turns = conversation.turns();
    if turns.is_empty() {
        return MetricScore::new(0.0).with_reason("Conversation has no turns");
    }

    let failing: Vec<String> = turns
        .iter()
        .enumerate()
        .filter(|(_, turn)| !check(turn.agent_output.as_str()))
        .map(|(idx, _)| (idx + 1).to_string())
        .collect();

    let score = (turns.len() - failing.len()) as f64 / turns.len() as f64;
    let reason = if failing.is_empty() {
        format!("Every reply {what}")
    } else {
        format!("Replies in turns {} do not satisfy: {what}", failing.join(", "))
    };
    MetricScore::new(score).with_reason(reason)
}

fn contains(haystack: &str, needle: &str, ignore_case: bool) -> bool {
    if ignore_case {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    } else {
        haystack.contains(needle)
    }
}

/// Replies must contain a substring.
#[derive(Debug, Clone)]
pub struct ContainsMetric {
    /// Pattern to look for.
    pub pattern: String,
    /// Whether to ignore case.
    pub ignore_case: bool,
    /// Minimum passing score.
    pub threshold: f64,
}

impl ContainsMetric {
    /// Create a new contains metric.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ignore_case: false,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Ignore case when searching.
    #[must_use]
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Set the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

#[async_trait]
impl Metric for ContainsMetric {
    fn name(&self) -> &str {
        "Contains"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn measure(&self, conversation: &Conversation) -> EvalResult<MetricScore> {
        let what = format!("contains '{}'", self.pattern);
        Ok(score_replies(conversation, &what, |reply| {
            contains(reply, &self.pattern, self.ignore_case)
        }))
    }
}

/// Replies must NOT contain a substring.
#[derive(Debug, Clone)]
pub struct NotContainsMetric {
    /// Pattern that should not appear.
    pub pattern: String,
    /// Whether to ignore case.
    pub ignore_case: bool,
    /// Minimum passing score.
    pub threshold: f64,
}

impl NotContainsMetric {
    /// Create a new not-contains metric.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ignore_case: false,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Ignore case when searching.
    #[must_use]
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Set the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

#[async_trait]
impl Metric for NotContainsMetric {
    fn name(&self) -> &str {
        "NotContains"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn measure(&self, conversation: &Conversation) -> EvalResult<MetricScore> {
        let what = format!("avoids '{}'", self.pattern);
        Ok(score_replies(conversation, &what, |reply| {
            !contains(reply, &self.pattern, self.ignore_case)
        }))
    }
}

/// Replies must match a regex.
#[derive(Debug, Clone)]
pub struct RegexMetric {
    regex: Regex,
    threshold: f64,
}

impl RegexMetric {
    /// Create a new regex metric.
    pub fn new(pattern: impl AsRef<str>) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(Regex::new(pattern.as_ref())?))
    }

    /// Create with an already-compiled regex.
    #[must_use]
    pub fn from_regex(regex: Regex) -> Self {
        Self {
            regex,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Set the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

#[async_trait]
impl Metric for RegexMetric {
    fn name(&self) -> &str {
        "Regex"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn measure(&self, conversation: &Conversation) -> EvalResult<MetricScore> {
        let what = format!("matches pattern '{}'", self.regex.as_str());
        Ok(score_replies(conversation, &what, |reply| self.regex.is_match(reply)))
    }
}

/// Replies must meet length constraints.
#[derive(Debug, Clone)]
pub struct LengthMetric {
    /// Minimum length.
    pub min: Option<usize>,
    /// Maximum length.
    pub max: Option<usize>,
    /// Count characters (default) or words.
    pub count_words: bool,
    /// Minimum passing score.
    pub threshold: f64,
}

impl Default for LengthMetric {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            count_words: false,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl LengthMetric {
    /// Create a new length metric.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set minimum length.
    #[must_use]
    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    /// Set maximum length.
    #[must_use]
    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Set both min and max.
    #[must_use]
    pub fn between(mut self, min: usize, max: usize) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Count words instead of characters.
    #[must_use]
    pub fn words(mut self) -> Self {
        self.count_words = true;
        self
    }

    /// Set the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    fn length(&self, reply: &str) -> usize {
        if self.count_words {
            reply.split_whitespace().count()
        } else {
            reply.chars().count()
        }
    }
}

#[async_trait]
impl Metric for LengthMetric {
    fn name(&self) -> &str {
        "Length"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn measure(&self, conversation: &Conversation) -> EvalResult<MetricScore> {
        let unit = if self.count_words { "words" } else { "chars" };
        let what = match (self.min, self.max) {
            (Some(min), Some(max)) => format!("is {min}-{max} {unit}"),
            (Some(min), None) => format!("is at least {min} {unit}"),
            (None, Some(max)) => format!("is at most {max} {unit}"),
            (None, None) => format!("has any length in {unit}"),
        };
        Ok(score_replies(conversation, &what, |reply| {
            let len = self.length(reply);
            self.min.map_or(true, |min| len >= min) && self.max.map_or(true, |max| len <= max)
        }))
    }
}

/// Function-based metric over the whole conversation.
pub struct FunctionMetric<F> {
    name: String,
    threshold: f64,
    func: F,
}

impl<F> FunctionMetric<F>
where
    F: Fn(&Conversation) -> MetricScore + Send + Sync,
{
    /// Create a new function-based metric.
    pub fn new(name: impl Into<String>, threshold: f64, func: F) -> Self {
        Self {
            name: name.into(),
            threshold,
            func,
        }
    }
}

#[async_trait]
impl<F> Metric for FunctionMetric<F>
where
    F: Fn(&Conversation) -> MetricScore + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn measure(&self, conversation: &Conversation) -> EvalResult<MetricScore> {
        Ok((self.func)(conversation))
    }
}

/// Build a per-turn [`FunctionMetric`] from a predicate over single turns.
pub fn turn_metric<P>(
    name: impl Into<String>,
    threshold: f64,
    predicate: P,
) -> FunctionMetric<impl Fn(&Conversation) -> MetricScore + Send + Sync>
where
    P: Fn(&Turn) -> bool + Send + Sync,
{
    FunctionMetric::new(name, threshold, move |conversation: &Conversation| {
        let turns = conversation.turns();
        if turns.is_empty() {
            return MetricScore::new(0.0).with_reason("Conversation has no turns");
        }
        let passing = turns.iter().filter(|t| predicate(*t)).count();
        MetricScore::new(passing as f64 / turns.len() as f64)
            .with_reason(format!("{passing}/{} turns passed", turns.len()))
    })
}
