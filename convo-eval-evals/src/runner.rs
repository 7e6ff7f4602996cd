//! Batch scoring.

use crate::error::{EvalError, EvalResult};
use crate::evaluator::{BoxedMetric, Metric, MetricResult, MetricSet};
use crate::report::{ConversationResult, EvaluationReport};
use async_trait::async_trait;
use convo_eval_core::{Conversation, ConversationBatch};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Scores a batch of conversations.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Score every conversation in the batch, once, in batch order.
    async fn score(&self, batch: &ConversationBatch) -> EvalResult<EvaluationReport>;
}

/// Options for scoring.
#[derive(Debug, Clone)]
pub struct ScoreOptions {
    /// Maximum conversations scored at once.
    pub concurrency: usize,
    /// Timeout per conversation, covering all of its metrics.
    pub timeout: Option<Duration>,
    /// Name given to the produced report.
    pub report_name: Option<String>,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: None,
            report_name: None,
        }
    }
}

impl ScoreOptions {
    /// Create new options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set concurrency.
    #[must_use]
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Set timeout per conversation.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the report name.
    #[must_use]
    pub fn report_name(mut self, name: impl Into<String>) -> Self {
        self.report_name = Some(name.into());
        self
    }
}

/// Runs a [`MetricSet`] over every conversation of a batch.
///
/// A metric error or a timeout becomes an errored [`MetricResult`]; it never
/// aborts the batch.
#[derive(Debug, Clone, Default)]
pub struct MetricScorer {
    metrics: MetricSet,
    options: ScoreOptions,
}

impl MetricScorer {
    /// Create a scorer with no metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metric.
    #[must_use]
    pub fn metric<M: Metric + 'static>(mut self, metric: M) -> Self {
        self.metrics = self.metrics.with_metric(metric);
        self
    }

    /// Add several shared metrics.
    #[must_use]
    pub fn metrics(mut self, metrics: impl IntoIterator<Item = BoxedMetric>) -> Self {
        for metric in metrics {
            self.metrics = self.metrics.with_shared(metric);
        }
        self
    }

    /// Set options.
    #[must_use]
    pub fn options(mut self, options: ScoreOptions) -> Self {
        self.options = options;
        self
    }

    /// The configured metrics.
    #[must_use]
    pub fn metric_set(&self) -> &MetricSet {
        &self.metrics
    }

    async fn score_one(&self, index: usize, conversation: &Conversation) -> ConversationResult {
        let start = Instant::now();
        let evaluation = self.metrics.evaluate(conversation);

        let metrics = match self.options.timeout {
            Some(limit) => match timeout(limit, evaluation).await {
                Ok(results) => results,
                Err(_) => {
                    warn!(conversation = %conversation.id(), ?limit, "scoring timed out");
                    self.metrics
                        .describe()
                        .map(|(name, threshold)| {
                            MetricResult::errored(
                                name,
                                threshold,
                                format!("Evaluation exceeded timeout of {:?}", limit),
                            )
                        })
                        .collect()
                }
            },
            None => evaluation.await,
        };

        let duration = start.elapsed();
        debug!(conversation = %conversation.id(), ?duration, "scored conversation");
        ConversationResult::new(
            conversation.id().clone(),
            index,
            conversation.len(),
            metrics,
            duration,
        )
    }
}

#[async_trait]
impl Scorer for MetricScorer {
    async fn score(&self, batch: &ConversationBatch) -> EvalResult<EvaluationReport> {
        info!(
            conversations = batch.len(),
            metrics = self.metrics.len(),
            "scoring batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));

        let tasks: Vec<_> = batch
            .iter()
            .enumerate()
            .map(|(idx, conversation)| {
                let sem = semaphore.clone();
                async move {
                    let _permit = sem
                        .acquire()
                        .await
                        .map_err(|e| EvalError::Other(e.into()))?;
                    Ok::<_, EvalError>(self.score_one(idx, conversation).await)
                }
            })
            .collect();

        let results = futures::future::join_all(tasks)
            .await
            .into_iter()
            .collect::<EvalResult<Vec<_>>>()?;

        let mut report = EvaluationReport::new(results);
        if let Some(name) = &self.options.report_name {
            report = report.with_name(name.clone());
        }

        info!(
            passed = report.summary.passed,
            failed = report.summary.failed,
            errors = report.summary.errors,
            "scoring finished"
        );
        Ok(report)
    }
}
