//! Evaluation reports and summaries.

use crate::evaluator::MetricResult;
use convo_eval_core::ConversationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Results of all metrics for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResult {
    /// Conversation id.
    pub conversation_id: ConversationId,
    /// Position of the conversation in the scored batch.
    pub index: usize,
    /// Number of turns scored.
    pub turns: usize,
    /// Per-metric results, in metric order.
    pub metrics: Vec<MetricResult>,
    /// Context the agent retrieved while answering, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_context: Option<Vec<String>>,
    /// Scoring duration.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl ConversationResult {
    /// Create a new conversation result.
    #[must_use]
    pub fn new(
        conversation_id: ConversationId,
        index: usize,
        turns: usize,
        metrics: Vec<MetricResult>,
        duration: Duration,
    ) -> Self {
        Self {
            conversation_id,
            index,
            turns,
            metrics,
            retrieval_context: None,
            duration,
        }
    }

    /// Attach retrieval context.
    #[must_use]
    pub fn with_retrieval_context(mut self, context: Vec<String>) -> Self {
        self.retrieval_context = Some(context);
        self
    }

    /// Check if every metric succeeded.
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.metrics.is_empty() && self.metrics.iter().all(|m| m.success)
    }

    /// Check if any metric errored.
    #[must_use]
    pub fn errored(&self) -> bool {
        self.metrics.iter().any(MetricResult::is_error)
    }

    /// Check if any metric ran and scored below its threshold.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.metrics.iter().any(|m| !m.success && !m.is_error())
    }

    /// Average score over the metrics that produced one.
    #[must_use]
    pub fn average_score(&self) -> Option<f64> {
        mean(self.metrics.iter().filter_map(|m| m.score))
    }

    /// Total evaluation cost.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.metrics.iter().filter_map(|m| m.evaluation_cost).sum()
    }
}

impl fmt::Display for ConversationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed() {
            "✅"
        } else if self.errored() {
            "⚠️"
        } else {
            "❌"
        };

        writeln!(
            f,
            "{} {} ({} turns, {:?})",
            status, self.conversation_id, self.turns, self.duration
        )?;

        for metric in &self.metrics {
            writeln!(f, "    {}", metric)?;
        }

        Ok(())
    }
}

/// Summary statistics for an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of conversations.
    pub total_conversations: usize,
    /// Conversations where every metric succeeded.
    pub passed: usize,
    /// Conversations with at least one metric below threshold.
    pub failed: usize,
    /// Conversations with at least one errored metric.
    pub errors: usize,
    /// Pass rate (0.0 to 1.0).
    pub pass_rate: f64,
    /// Average score over all scored metrics.
    pub average_score: Option<f64>,
    /// Total evaluation cost.
    pub total_cost: f64,
    /// Total scoring duration.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Per-metric statistics, by metric name.
    pub metric_stats: BTreeMap<String, MetricStats>,
}

/// Statistics for a single metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    /// Metric name.
    pub name: String,
    /// Total evaluations.
    pub total: usize,
    /// Successful evaluations.
    pub passed: usize,
    /// Evaluations below threshold.
    pub failed: usize,
    /// Evaluations that errored.
    pub errors: usize,
    /// Pass rate.
    pub pass_rate: f64,
    /// Average score.
    pub average_score: Option<f64>,
    /// Total cost.
    pub total_cost: f64,
}

/// Full evaluation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Report name.
    pub name: Option<String>,
    /// Per-conversation results, in batch order.
    pub conversations: Vec<ConversationResult>,
    /// Summary statistics.
    pub summary: ReportSummary,
    /// Timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl EvaluationReport {
    /// Create a new report from conversation results.
    #[must_use]
    pub fn new(conversations: Vec<ConversationResult>) -> Self {
        let summary = Self::compute_summary(&conversations);
        Self {
            name: None,
            conversations,
            summary,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Set the report name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn compute_summary(conversations: &[ConversationResult]) -> ReportSummary {
        let total_conversations = conversations.len();
        let passed = conversations.iter().filter(|c| c.passed()).count();
        let failed = conversations.iter().filter(|c| c.failed()).count();
        let errors = conversations.iter().filter(|c| c.errored()).count();

        let pass_rate = if total_conversations > 0 {
            passed as f64 / total_conversations as f64
        } else {
            0.0
        };

        let all_metrics = || conversations.iter().flat_map(|c| c.metrics.iter());
        let average_score = mean(all_metrics().filter_map(|m| m.score));
        let total_cost = all_metrics().filter_map(|m| m.evaluation_cost).sum();
        let total_duration = conversations.iter().map(|c| c.duration).sum();

        let mut metric_stats: BTreeMap<String, MetricStats> = BTreeMap::new();
        let mut metric_scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for metric in all_metrics() {
            let stats = metric_stats
                .entry(metric.name.clone())
                .or_insert_with(|| MetricStats {
                    name: metric.name.clone(),
                    total: 0,
                    passed: 0,
                    failed: 0,
                    errors: 0,
                    pass_rate: 0.0,
                    average_score: None,
                    total_cost: 0.0,
                });

            stats.total += 1;
            if metric.is_error() {
                stats.errors += 1;
            } else if metric.success {
                stats.passed += 1;
            } else {
                stats.failed += 1;
            }
            stats.total_cost += metric.evaluation_cost.unwrap_or(0.0);

            if let Some(score) = metric.score {
                metric_scores
                    .entry(metric.name.clone())
                    .or_default()
                    .push(score);
            }
        }

        for stats in metric_stats.values_mut() {
            stats.pass_rate = if stats.total > 0 {
                stats.passed as f64 / stats.total as f64
            } else {
                0.0
            };
            stats.average_score = metric_scores
                .get(&stats.name)
                .and_then(|scores| mean(scores.iter().copied()));
        }

        ReportSummary {
            total_conversations,
            passed,
            failed,
            errors,
            pass_rate,
            average_score,
            total_cost,
            total_duration,
            metric_stats,
        }
    }

    /// Get passed conversations.
    pub fn passed_conversations(&self) -> impl Iterator<Item = &ConversationResult> {
        self.conversations.iter().filter(|c| c.passed())
    }

    /// Get conversations that did not pass.
    pub fn failed_conversations(&self) -> impl Iterator<Item = &ConversationResult> {
        self.conversations.iter().filter(|c| !c.passed())
    }

    /// Render as text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str("\n\u{1F4CA} Conversation Evaluation Report\n");
        output.push_str("════════════════════════════════\n\n");

        if let Some(ref name) = self.name {
            output.push_str(&format!("Name: {}\n", name));
        }
        output.push_str(&format!("Timestamp: {}\n\n", self.timestamp));

        output.push_str(&format!(
            "Total Conversations: {}\n",
            self.summary.total_conversations
        ));
        output.push_str(&format!(
            "✅ Passed: {} ({:.1}%)\n",
            self.summary.passed,
            self.summary.pass_rate * 100.0
        ));
        output.push_str(&format!("❌ Failed: {}\n", self.summary.failed));

        if self.summary.errors > 0 {
            output.push_str(&format!("⚠️ Errors: {}\n", self.summary.errors));
        }

        if let Some(avg) = self.summary.average_score {
            output.push_str(&format!("\n\u{1F4C8} Average Score: {:.2}\n", avg));
        }
        output.push_str(&format!("\u{1F4B2} Total Cost: ${:.4}\n", self.summary.total_cost));

        output.push_str(&format!(
            "\n⏱️ Duration: {:?}\n",
            self.summary.total_duration
        ));

        if !self.summary.metric_stats.is_empty() {
            output.push_str("\nMetric Breakdown:\n");
            for (name, stats) in &self.summary.metric_stats {
                output.push_str(&format!(
                    "  {}: {}/{} ({:.1}%)",
                    name,
                    stats.passed,
                    stats.total,
                    stats.pass_rate * 100.0
                ));
                if let Some(avg) = stats.average_score {
                    output.push_str(&format!(", avg {:.2}", avg));
                }
                output.push('\n');
            }
        }

        let failed: Vec<_> = self.failed_conversations().collect();
        if !failed.is_empty() {
            output.push_str("\nFailed Conversations:\n");
            for convo in failed.iter().take(10) {
                output.push_str(&format!("  - {}\n", convo.conversation_id));
            }
            if failed.len() > 10 {
                output.push_str(&format!("  ... and {} more\n", failed.len() - 10));
            }
        }

        output
    }

    /// Render as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Serde helper for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::MetricScore;

    fn metric(name: &str, score: f64, threshold: f64) -> MetricResult {
        MetricResult::from_score(name, threshold, MetricScore::new(score).with_cost(0.01))
    }

    fn make_convo(id: &str, metrics: Vec<MetricResult>) -> ConversationResult {
        ConversationResult::new(
            ConversationId::from(id),
            0,
            2,
            metrics,
            Duration::from_millis(100),
        )
    }

    #[test]
    fn test_conversation_result_passed() {
        let convo = make_convo("a", vec![metric("Correctness", 0.9, 0.85)]);
        assert!(convo.passed());
        assert!(!convo.failed());
        assert!(!convo.errored());
    }

    #[test]
    fn test_conversation_result_failed() {
        let convo = make_convo(
            "a",
            vec![metric("Correctness", 0.9, 0.85), metric("Verification", 0.5, 0.7)],
        );
        assert!(!convo.passed());
        assert!(convo.failed());
        assert!((convo.average_score().unwrap() - 0.7).abs() < 1e-9);
        assert!((convo.cost() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_no_metrics_is_not_a_pass() {
        assert!(!make_convo("a", vec![]).passed());
    }

    #[test]
    fn test_report_summary() {
        let report = EvaluationReport::new(vec![
            make_convo("a", vec![metric("Correctness", 0.9, 0.85)]),
            make_convo("b", vec![metric("Correctness", 0.95, 0.85)]),
            make_convo("c", vec![metric("Correctness", 0.2, 0.85)]),
            make_convo("d", vec![MetricResult::errored("Correctness", 0.85, "timeout")]),
        ]);

        let summary = &report.summary;
        assert_eq!(summary.total_conversations, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors, 1);
        assert!((summary.pass_rate - 0.5).abs() < 1e-9);
        assert!((summary.total_cost - 0.03).abs() < 1e-9);

        let stats = &summary.metric_stats["Correctness"];
        assert_eq!(stats.total, 4);
        assert_eq!(stats.passed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_report_text() {
        let report = EvaluationReport::new(vec![
            make_convo("ok", vec![metric("Correctness", 0.9, 0.85)]),
            make_convo("bad", vec![metric("Correctness", 0.1, 0.85)]),
        ])
        .with_name("Nightly");
        let text = report.to_text();

        assert!(text.contains("Nightly"));
        assert!(text.contains("50.0%"));
        assert!(text.contains("Correctness: 1/2"));
        assert!(text.contains("- bad"));
        assert!(!text.contains("- ok"));
    }

    #[test]
    fn test_report_json() {
        let report = EvaluationReport::new(vec![make_convo(
            "a",
            vec![metric("Correctness", 0.9, 0.85)],
        )]);
        let json = report.to_json().unwrap();

        assert!(json.contains("total_conversations"));
        assert!(json.contains("pass_rate"));
        let back: EvaluationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary.passed, 1);
    }

    #[test]
    fn test_empty_report() {
        let report = EvaluationReport::new(vec![]);
        assert_eq!(report.summary.pass_rate, 0.0);
        assert_eq!(report.summary.average_score, None);
    }
}
