//! # convo-eval - Support Chatbot Conversation Evaluation
//!
//! convo-eval pulls support conversations from Kustomer (or simulates them
//! against the chatbot's test endpoint), rebuilds them into customer/agent
//! turns, writes them to a tabular report, scores them with rubric metrics,
//! and writes the scores to a results table.
//!
//! ## Quick Start
//!
//! ```ignore
//! use convo_eval::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_env();
//!     let client = KustomerClient::new(config.require_kustomer()?.clone())?;
//!     let filter = SearchFilter::yesterday().for_config(client.config());
//!
//!     let judge: Arc<dyn Judge> = Arc::new(config.judge.build()?);
//!     let scorer = MetricScorer::new().metrics(rubric_metrics(default_rubrics(), judge));
//!
//!     let options = RunOptions::new("results", &config.app_url);
//!     if let Some(output) = nightly(&client, &filter, 8, Some(&scorer), &options).await? {
//!         println!("{}", output.report.unwrap());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`convo_eval_core`] - messages, turns, conversations, pairing
//! - [`convo_eval_evals`] - tabular reports, metrics, scoring, results
//! - [`convo_eval_sources`] - Kustomer, chatbot endpoint, simulator
//!
//! The `convo-eval` binary wraps the [`pipeline`] functions.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod pipeline;

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Messages, turns and conversations.
pub use convo_eval_core as core;

/// Reports, metrics and scoring.
pub use convo_eval_evals as evals;

/// Conversation sources.
pub use convo_eval_sources as sources;

// ============================================================================
// Flat Re-exports
// ============================================================================

// Core
pub use convo_eval_core::{
    assemble, pair, Conversation, ConversationBatch, ConversationId, Direction, Message, Turn,
};

// Evals
pub use convo_eval_evals::{
    default_rubrics, parse_tabular, read_report, rubric_metrics, write_report, write_results,
    write_results_file, write_tabular, ConversationDataset, EvalError, EvaluationReport, Judge,
    Metric, MetricScorer, OpenAiJudge, ReplyChecks, Rubric, RubricMetric, ScoreOptions, Scorer,
};

// Sources
pub use convo_eval_sources::{
    ChatbotClient, ConversationScript, KustomerClient, MessageSource, Responder,
    ScriptedSimulator, SearchFilter, SourceError,
};

// Pipeline
pub use config::{load_dotenv, AppConfig, JudgeConfig};
pub use pipeline::{
    collect_batch, load_batch, nightly, replay, simulate, PipelineError, PipelineResult,
    RunOptions, RunOutput,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        assemble, collect_batch, default_rubrics, nightly, pair, replay, rubric_metrics,
        simulate, AppConfig, Conversation, ConversationBatch, Judge, KustomerClient, Message,
        MessageSource, MetricScorer, RunOptions, ScoreOptions, Scorer, SearchFilter, Turn,
    };
}
