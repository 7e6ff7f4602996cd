//! # convo-eval-evals
//!
//! Reading, writing and scoring support-chatbot conversations.
//!
//! ## Core Concepts
//!
//! - **[`write_tabular`] / [`parse_tabular`]**: the tabular report format,
//!   one row per turn with blank rows between conversations
//! - **[`Metric`]**: trait for conversation-level metrics
//! - **[`Scorer`] / [`MetricScorer`]**: scores a whole batch
//! - **[`EvaluationReport`]**: per-conversation results with statistics
//! - **[`write_results`]**: the scored results table
//!
//! ## Built-in Metrics
//!
//! - **[`ContainsMetric`]** / **[`NotContainsMetric`]**: agent replies must
//!   (not) contain a substring
//! - **[`RegexMetric`]**: agent replies must match a pattern
//! - **[`LengthMetric`]**: agent replies must meet length constraints
//! - **[`FunctionMetric`]**: custom scoring function
//! - **[`RubricMetric`]**: LLM judge grading against a [`Rubric`]
//!
//! [`ReplyChecks`] bundles the reply-level metrics for command-line use.
//!
//! ## Example
//!
//! ```rust
//! use convo_eval_core::{assemble, Turn};
//! use convo_eval_evals::{parse_tabular_str, write_tabular_string};
//!
//! let convo = assemble(vec![Turn::new("hi", "Hello! How can I help?")], "c1");
//! let text = write_tabular_string([&convo]).unwrap();
//! assert_eq!(text, "Turn,Input,Actual Output\r\nTurn 1,hi,Hello! How can I help?\r\n");
//!
//! let batch = parse_tabular_str(&text).unwrap();
//! assert_eq!(batch.as_slice()[0].turns(), convo.turns());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod judge;
pub mod presets;
pub mod report;
pub mod results;
pub mod rubric;
pub mod runner;
pub mod scorers;
pub mod tabular;

// Re-exports
pub use dataset::ConversationDataset;
pub use error::{EvalError, EvalResult};
pub use evaluator::{BoxedMetric, Metric, MetricResult, MetricScore, MetricSet};
pub use judge::{Judge, JudgeResponse, OpenAiJudge, Pricing, TokenUsage};
pub use presets::{
    answered_metric, correctness_rubric, default_rubrics, rubric_metrics, verification_rubric,
    ReplyChecks,
};
pub use report::{ConversationResult, EvaluationReport, MetricStats, ReportSummary};
pub use results::{write_results, write_results_file, DEFAULT_CONVERSATION_URL_BASE};
pub use rubric::{Rubric, RubricMetric};
pub use runner::{MetricScorer, ScoreOptions, Scorer};
pub use scorers::{
    turn_metric, ContainsMetric, FunctionMetric, LengthMetric, NotContainsMetric, RegexMetric,
};
pub use tabular::{
    parse_tabular, parse_tabular_bytes, parse_tabular_str, read_report, write_report,
    write_tabular, write_tabular_string,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        default_rubrics, parse_tabular, read_report, rubric_metrics, write_report,
        write_results_file, write_tabular, ContainsMetric, EvalError, EvalResult,
        EvaluationReport, Metric, MetricScore, MetricScorer, OpenAiJudge, Rubric, ScoreOptions,
        Scorer,
    };
}
