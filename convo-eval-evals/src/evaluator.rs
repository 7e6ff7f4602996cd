//! Metric traits and per-metric results.

use crate::error::EvalResult;
use async_trait::async_trait;
use convo_eval_core::Conversation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Raw output of a single metric measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    /// Score in `0.0..=1.0`.
    pub score: f64,
    /// Why the metric gave this score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// What the measurement cost, in dollars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_cost: Option<f64>,
}

impl MetricScore {
    /// Create a score with no reason or cost.
    #[must_use]
    pub fn new(score: f64) -> Self {
        Self {
            score,
            reason: None,
            evaluation_cost: None,
        }
    }

    /// Set the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the cost.
    #[must_use]
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.evaluation_cost = Some(cost);
        self
    }
}

/// A conversation-level metric.
///
/// Implementations return a score; pass/fail is decided by comparing it to
/// [`threshold`](Metric::threshold).
#[async_trait]
pub trait Metric: Send + Sync {
    /// Metric name, as shown in reports.
    fn name(&self) -> &str;

    /// Minimum passing score.
    fn threshold(&self) -> f64;

    /// Measure one conversation.
    async fn measure(&self, conversation: &Conversation) -> EvalResult<MetricScore>;
}

/// Shared metric for dynamic dispatch.
pub type BoxedMetric = Arc<dyn Metric>;

/// Outcome of one metric on one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Metric name.
    pub name: String,
    /// Threshold the score was compared against.
    pub threshold: f64,
    /// Whether the score met the threshold.
    pub success: bool,
    /// Score, absent when the metric errored.
    pub score: Option<f64>,
    /// Reason given by the metric.
    pub reason: Option<String>,
    /// Evaluation cost, if the metric reports one.
    pub evaluation_cost: Option<f64>,
    /// Error message when the metric could not run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricResult {
    /// Build a result from a successful measurement.
    #[must_use]
    pub fn from_score(name: impl Into<String>, threshold: f64, score: MetricScore) -> Self {
        Self {
            name: name.into(),
            threshold,
            success: score.score >= threshold,
            score: Some(score.score),
            reason: score.reason,
            evaluation_cost: score.evaluation_cost,
            error: None,
        }
    }

    /// Build a result for a metric that failed to run.
    #[must_use]
    pub fn errored(name: impl Into<String>, threshold: f64, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            threshold,
            success: false,
            score: None,
            reason: None,
            evaluation_cost: None,
            error: Some(error.into()),
        }
    }

    /// Check if the metric errored.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for MetricResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            return write!(f, "⚠️ {} ERROR: {}", self.name, error);
        }
        let status = if self.success { "✅" } else { "❌" };
        write!(f, "{} {}", status, self.name)?;
        if let Some(score) = self.score {
            write!(f, " (score: {:.2}, threshold: {:.2})", score, self.threshold)?;
        }
        if let Some(reason) = &self.reason {
            write!(f, " - {}", reason)?;
        }
        Ok(())
    }
}

/// Collection of metrics run together.
#[derive(Clone, Default)]
pub struct MetricSet {
    metrics: Vec<BoxedMetric>,
}

impl MetricSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metric.
    #[must_use]
    pub fn with_metric<M: Metric + 'static>(mut self, metric: M) -> Self {
        self.metrics.push(Arc::new(metric));
        self
    }

    /// Add an already shared metric.
    #[must_use]
    pub fn with_shared(mut self, metric: BoxedMetric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Run all metrics on a conversation, in order.
    ///
    /// A metric that returns an error yields an errored [`MetricResult`];
    /// the remaining metrics still run.
    pub async fn evaluate(&self, conversation: &Conversation) -> Vec<MetricResult> {
        let mut results = Vec::with_capacity(self.metrics.len());
        for metric in &self.metrics {
            let result = match metric.measure(conversation).await {
                Ok(score) => MetricResult::from_score(metric.name(), metric.threshold(), score),
                Err(e) => {
                    warn!(
                        metric = metric.name(),
                        conversation = %conversation.id(),
                        error = %e,
                        "metric failed"
                    );
                    MetricResult::errored(metric.name(), metric.threshold(), e.to_string())
                }
            };
            results.push(result);
        }
        results
    }

    /// Metric names with thresholds, in order.
    pub fn describe(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.metrics.iter().map(|m| (m.name(), m.threshold()))
    }

    /// Get the number of metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl fmt::Debug for MetricSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.metrics.iter().map(|m| m.name()))
            .finish()
    }
}
