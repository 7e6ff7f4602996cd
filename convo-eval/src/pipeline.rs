//! End-to-end pipelines: fetch or simulate, write the report, score, write
//! the results table.

use convo_eval_core::{assemble, pair, ConversationBatch};
use convo_eval_evals::{
    read_report, write_report, write_results_file, ConversationDataset, EvalError,
    EvaluationReport, Scorer,
};
use convo_eval_sources::{
    ConversationScript, MessageSource, ScriptedSimulator, SearchFilter, SourceError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source error.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Report or scoring error.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A required setting is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    /// A gated replay found nothing to score.
    #[error("No conversations in {}", .0.display())]
    EmptyReport(PathBuf),

    /// A gated run had failing conversations.
    #[error("{failed} of {total} conversations failed")]
    ConversationsFailed {
        /// Conversations that did not pass.
        failed: usize,
        /// Conversations scored.
        total: usize,
    },
}

/// Result type for pipelines.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Timestamp format used in output file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Current local time formatted for file names.
#[must_use]
pub fn file_timestamp() -> String {
    chrono::Local::now().format(FILE_TIMESTAMP_FORMAT).to_string()
}

/// Fetch, pair and assemble every conversation matching `filter`.
///
/// Messages are fetched at most `concurrency` at a time. The batch keeps the
/// search order, and conversations that pair into zero turns are left out.
pub async fn collect_batch(
    source: &dyn MessageSource,
    filter: &SearchFilter,
    concurrency: usize,
) -> ConversationBatch {
    let refs = source.list_conversations(filter).await;
    info!(conversations = refs.len(), "found conversations");

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let fetches = refs.iter().map(|conversation| {
        let sem = semaphore.clone();
        async move {
            // The semaphore is never closed.
            let _permit = sem.acquire().await.ok();
            let messages = source.fetch_messages(&conversation.id).await;
            (conversation.id.as_str(), messages)
        }
    });

    let mut batch = ConversationBatch::new();
    for (id, messages) in futures::future::join_all(fetches).await {
        let turns = pair(&messages);
        if turns.is_empty() {
            debug!(conversation = id, messages = messages.len(), "no turns, skipping");
            continue;
        }
        batch.push(assemble(turns, id));
    }

    info!(
        conversations = batch.len(),
        turns = batch.turn_count(),
        "collected batch"
    );
    batch
}

/// Load conversations from a tabular report, or from a JSON/YAML dataset
/// when the extension says so. Datasets keep conversation ids.
pub fn load_batch(path: &Path) -> PipelineResult<ConversationBatch> {
    let batch = match path.extension().and_then(|e| e.to_str()) {
        Some("json" | "yaml" | "yml") => ConversationDataset::load(path)?.into_batch(),
        _ => read_report(path)?,
    };
    Ok(batch)
}

/// Where and how a pipeline writes its output.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Output directory, created if missing.
    pub output_dir: PathBuf,
    /// Base URL of conversation links in the results table.
    pub app_url: String,
    /// Timestamp embedded in output file names.
    pub timestamp: String,
    /// Also write the batch as a JSON dataset.
    pub save_dataset: bool,
    /// Refuse to score an empty replay.
    pub fail_on_error: bool,
}

impl RunOptions {
    /// Options writing to `output_dir` with the current time as timestamp.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, app_url: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            app_url: app_url.into(),
            timestamp: file_timestamp(),
            save_dataset: false,
            fail_on_error: false,
        }
    }

    /// Override the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Write a JSON dataset next to the report.
    #[must_use]
    pub fn with_dataset(mut self) -> Self {
        self.save_dataset = true;
        self
    }

    /// Treat an empty replay as an error.
    #[must_use]
    pub fn fail_on_error(mut self) -> Self {
        self.fail_on_error = true;
        self
    }

    /// Path of an output file named `{prefix}_{timestamp}.csv`.
    #[must_use]
    pub fn output_path(&self, prefix: &str) -> PathBuf {
        self.output_file(prefix, "csv")
    }

    /// Path of an output file named `{prefix}_{timestamp}.{extension}`.
    #[must_use]
    pub fn output_file(&self, prefix: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.{}", prefix, self.timestamp, extension))
    }
}

/// What a pipeline produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Conversation report written, if any.
    pub conversations_path: Option<PathBuf>,
    /// JSON dataset written, if requested.
    pub dataset_path: Option<PathBuf>,
    /// Results table written, if scoring ran.
    pub results_path: Option<PathBuf>,
    /// Scoring report, if scoring ran.
    pub report: Option<EvaluationReport>,
    /// Number of conversations handled.
    pub conversations: usize,
}

impl RunOutput {
    /// Fail unless every scored conversation passed.
    ///
    /// Runs without scoring pass trivially.
    pub fn ensure_passed(&self) -> PipelineResult<()> {
        let Some(report) = &self.report else {
            return Ok(());
        };
        let summary = &report.summary;
        if summary.passed < summary.total_conversations {
            return Err(PipelineError::ConversationsFailed {
                failed: summary.total_conversations - summary.passed,
                total: summary.total_conversations,
            });
        }
        Ok(())
    }
}

fn save_dataset(
    batch: &ConversationBatch,
    name: &str,
    options: &RunOptions,
) -> PipelineResult<Option<PathBuf>> {
    if !options.save_dataset {
        return Ok(None);
    }
    std::fs::create_dir_all(&options.output_dir).map_err(EvalError::from)?;
    let path = options.output_file(name, "json");
    ConversationDataset::from_batch(batch.clone())
        .with_name(name)
        .to_json(&path)?;
    debug!(path = %path.display(), "wrote dataset");
    Ok(Some(path))
}

async fn score_and_write(
    batch: &ConversationBatch,
    scorer: Option<&dyn Scorer>,
    options: &RunOptions,
) -> PipelineResult<(Option<PathBuf>, Option<EvaluationReport>)> {
    let Some(scorer) = scorer else {
        return Ok((None, None));
    };
    let report = scorer.score(batch).await?;
    let path = options.output_path("eval_results");
    write_results_file(&path, &report, &options.app_url)?;
    Ok((Some(path), Some(report)))
}

/// Fetch yesterday's conversations, write them, then score them.
///
/// Returns `None` when nothing was found; no files are written then.
pub async fn nightly(
    source: &dyn MessageSource,
    filter: &SearchFilter,
    concurrency: usize,
    scorer: Option<&dyn Scorer>,
    options: &RunOptions,
) -> PipelineResult<Option<RunOutput>> {
    let batch = collect_batch(source, filter, concurrency).await;
    if batch.is_empty() {
        info!("no conversations found");
        return Ok(None);
    }

    let conversations_path = options.output_path("conversations");
    write_report(&conversations_path, &batch)?;
    let dataset_path = save_dataset(&batch, "conversations", options)?;

    let (results_path, report) = score_and_write(&batch, scorer, options).await?;
    Ok(Some(RunOutput {
        conversations_path: Some(conversations_path),
        dataset_path,
        results_path,
        report,
        conversations: batch.len(),
    }))
}

/// Score a previously written conversation report or dataset.
///
/// With [`RunOptions::fail_on_error`] an empty input is an error and no
/// results are written; pair with [`RunOutput::ensure_passed`] to gate on
/// the scores.
pub async fn replay(
    report_path: &Path,
    scorer: &dyn Scorer,
    options: &RunOptions,
) -> PipelineResult<RunOutput> {
    let batch = load_batch(report_path)?;
    if batch.is_empty() && options.fail_on_error {
        return Err(PipelineError::EmptyReport(report_path.to_path_buf()));
    }
    let (results_path, report) = score_and_write(&batch, Some(scorer), options).await?;
    Ok(RunOutput {
        conversations_path: None,
        dataset_path: None,
        results_path,
        report,
        conversations: batch.len(),
    })
}

/// Play scripts against the chatbot, write the conversations, and score
/// them if a scorer is given.
pub async fn simulate(
    simulator: &ScriptedSimulator,
    scripts: &[ConversationScript],
    scorer: Option<&dyn Scorer>,
    options: &RunOptions,
) -> PipelineResult<RunOutput> {
    let batch = simulator.simulate_all(scripts).await;

    let conversations_path = options.output_path("simulated_conversations");
    write_report(&conversations_path, &batch)?;
    let dataset_path = save_dataset(&batch, "simulated_conversations", options)?;

    let (results_path, report) = score_and_write(&batch, scorer, options).await?;
    Ok(RunOutput {
        conversations_path: Some(conversations_path),
        dataset_path,
        results_path,
        report,
        conversations: batch.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use convo_eval_core::{Message, Turn};
    use convo_eval_evals::{ContainsMetric, MetricScorer};
    use convo_eval_sources::{ConversationRef, Responder};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;

    struct FakeSource {
        feeds: HashMap<String, Vec<Message>>,
        order: Vec<String>,
    }

    impl FakeSource {
        fn new(feeds: Vec<(&str, Vec<Message>)>) -> Self {
            Self {
                order: feeds.iter().map(|(id, _)| id.to_string()).collect(),
                feeds: feeds
                    .into_iter()
                    .map(|(id, feed)| (id.to_string(), feed))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl MessageSource for FakeSource {
        async fn list_conversations(&self, _filter: &SearchFilter) -> Vec<ConversationRef> {
            self.order
                .iter()
                .map(|id| ConversationRef { id: id.clone() })
                .collect()
        }

        async fn fetch_messages(&self, conversation_id: &str) -> Vec<Message> {
            // Later conversations answer first, so ordering relies on join_all.
            let position = self.order.iter().position(|id| id == conversation_id);
            let delay = self.order.len() - position.unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay as u64 * 5)).await;
            self.feeds.get(conversation_id).cloned().unwrap_or_default()
        }
    }

    fn source() -> FakeSource {
        FakeSource::new(vec![
            (
                "c1",
                vec![
                    Message::inbound("where are my tickets?"),
                    Message::outbound("Your order was delivered."),
                ],
            ),
            ("c2", vec![Message::outbound("Hi there!")]),
            (
                "c3",
                vec![
                    Message::inbound("a"),
                    Message::outbound("1"),
                    Message::inbound("b"),
                    Message::outbound("2"),
                ],
            ),
        ])
    }

    fn filter() -> SearchFilter {
        SearchFilter::yesterday()
    }

    #[tokio::test]
    async fn test_collect_batch_keeps_order_and_drops_empty() {
        let batch = collect_batch(&source(), &filter(), 3).await;

        let ids: Vec<_> = batch.iter().map(|c| c.id().as_str()).collect();
        assert_eq!(ids, ["c1", "c3"]);
        assert_eq!(
            batch.as_slice()[1].turns(),
            &[Turn::new("b", "2"), Turn::new("a", "1")]
        );
    }

    #[tokio::test]
    async fn test_nightly_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions::new(dir.path().join("out"), "https://app.test/conversations")
            .with_timestamp("20240101_000000");
        let scorer = MetricScorer::new().metric(ContainsMetric::new("order"));

        let output = nightly(&source(), &filter(), 2, Some(&scorer), &options)
            .await
            .unwrap()
            .unwrap();

        let conversations = output.conversations_path.unwrap();
        assert!(conversations.ends_with("conversations_20240101_000000.csv"));
        let parsed = read_report(&conversations).unwrap();
        assert_eq!(parsed.len(), 2);

        let results = std::fs::read_to_string(output.results_path.unwrap()).unwrap();
        assert!(results.contains("https://app.test/conversations/c1,True,Contains"));
        assert!(results.contains("https://app.test/conversations/c3,False,Contains"));
        assert_eq!(output.report.unwrap().summary.passed, 1);
    }

    #[tokio::test]
    async fn test_nightly_with_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions::new(dir.path(), "https://app.test");
        let empty = FakeSource::new(vec![("c2", vec![Message::outbound("hi")])]);

        let output = nightly(&empty, &filter(), 2, None, &options).await.unwrap();
        assert!(output.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_replay_scores_report() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("conversations.csv");
        std::fs::write(
            &report_path,
            "Turn,Input,Actual Output\r\nTurn 1,hi,Your order is here\r\n",
        )
        .unwrap();
        let options = RunOptions::new(dir.path(), "https://app.test").with_timestamp("t");
        let scorer = MetricScorer::new().metric(ContainsMetric::new("order"));

        let output = replay(&report_path, &scorer, &options).await.unwrap();

        assert_eq!(output.conversations, 1);
        let results_path = output.results_path.unwrap();
        assert_eq!(results_path, dir.path().join("eval_results_t.csv"));
        let results = std::fs::read_to_string(results_path).unwrap();
        assert!(results.contains("https://app.test/simulated,True"));
    }

    fn write_two_conversations(path: &Path) {
        std::fs::write(
            path,
            "Turn,Input,Actual Output\r\n\
             Turn 1,hi,Your order is here\r\n\
             \r\n\r\n\r\n\
             Turn 1,hello,Please hold\r\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_replay_gate_rejects_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("conversations.csv");
        std::fs::write(&report_path, "Turn,Input,Actual Output\r\n").unwrap();
        let options = RunOptions::new(dir.path(), "https://app.test")
            .with_timestamp("t")
            .fail_on_error();
        let scorer = MetricScorer::new().metric(ContainsMetric::new("order"));

        let err = replay(&report_path, &scorer, &options).await.unwrap_err();

        assert!(matches!(err, PipelineError::EmptyReport(ref p) if p == &report_path));
        assert!(!dir.path().join("eval_results_t.csv").exists());
    }

    #[tokio::test]
    async fn test_replay_gate_on_scores() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("conversations.csv");
        write_two_conversations(&report_path);
        let options = RunOptions::new(dir.path(), "https://app.test")
            .with_timestamp("t")
            .fail_on_error();

        let strict = MetricScorer::new().metric(ContainsMetric::new("order"));
        let output = replay(&report_path, &strict, &options).await.unwrap();
        assert!(matches!(
            output.ensure_passed(),
            Err(PipelineError::ConversationsFailed { failed: 1, total: 2 })
        ));

        let lenient = MetricScorer::new().metric(ContainsMetric::new("order").with_threshold(0.0));
        let output = replay(&report_path, &lenient, &options).await.unwrap();
        assert!(output.ensure_passed().is_ok());
    }

    #[tokio::test]
    async fn test_replay_empty_report_without_gate() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("conversations.csv");
        std::fs::write(&report_path, "Turn,Input,Actual Output\r\n").unwrap();
        let options = RunOptions::new(dir.path(), "https://app.test").with_timestamp("t");
        let scorer = MetricScorer::new().metric(ContainsMetric::new("order"));

        let output = replay(&report_path, &scorer, &options).await.unwrap();
        assert_eq!(output.conversations, 0);
        assert!(output.ensure_passed().is_ok());
    }

    #[tokio::test]
    async fn test_nightly_dataset_replays_with_ids() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions::new(dir.path(), "https://app.test")
            .with_timestamp("t")
            .with_dataset();

        let output = nightly(&source(), &filter(), 2, None, &options)
            .await
            .unwrap()
            .unwrap();
        let dataset_path = output.dataset_path.unwrap();
        assert_eq!(dataset_path, dir.path().join("conversations_t.json"));

        let scorer = MetricScorer::new().metric(ContainsMetric::new("order"));
        let replayed = replay(&dataset_path, &scorer, &options).await.unwrap();
        assert_eq!(replayed.conversations, 2);
        let results = std::fs::read_to_string(replayed.results_path.unwrap()).unwrap();
        assert!(results.contains("https://app.test/c1,True,Contains"));
        assert!(results.contains("https://app.test/c3,False,Contains"));
    }

    struct Canned;

    #[async_trait]
    impl Responder for Canned {
        async fn respond(&self, _user_message: &str) -> String {
            "Please share your phone number.".to_string()
        }
    }

    #[tokio::test]
    async fn test_simulate_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions::new(dir.path(), "https://app.test").with_timestamp("t");
        let simulator = ScriptedSimulator::new(Arc::new(Canned));
        let scripts = vec![ConversationScript::new("s", ["hi", "my tickets?"])];

        let output = simulate(&simulator, &scripts, None, &options).await.unwrap();

        assert!(output.results_path.is_none());
        let path = output.conversations_path.unwrap();
        assert_eq!(path, dir.path().join("simulated_conversations_t.csv"));
        let parsed = read_report(&path).unwrap();
        assert_eq!(parsed.turn_count(), 2);
        assert_eq!(parsed.as_slice()[0].turns()[0].customer_input, "my tickets?");
    }
}
