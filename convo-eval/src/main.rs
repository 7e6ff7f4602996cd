//! convo-eval CLI
//!
//! Nightly evaluation of support chatbot conversations.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use convo_eval::config::{load_dotenv, AppConfig};
use convo_eval::evals::{
    default_rubrics, rubric_metrics, MetricScorer, ReplyChecks, Rubric, ScoreOptions,
};
use convo_eval::pipeline::{self, RunOptions, RunOutput};
use convo_eval::sources::{
    default_scripts, ChatbotClient, ConversationScript, KustomerClient, ScriptedSimulator,
    SearchFilter,
};
use convo_eval::{Judge, Scorer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "convo-eval")]
#[command(about = "Evaluate support chatbot conversations", long_about = None)]
struct Cli {
    /// Output directory
    #[arg(short, long, default_value = "results/convo_eval", global = true)]
    output_dir: PathBuf,

    /// Conversations scored at once
    #[arg(long, default_value_t = 4, global = true)]
    concurrency: usize,

    /// Per-conversation scoring timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// YAML file with rubrics to score with instead of the stock ones
    #[arg(long, global = true)]
    rubrics: Option<PathBuf>,

    /// Write conversations only, do not score them
    #[arg(long, global = true)]
    skip_scoring: bool,

    /// Score with the reply checks only, without the judged rubrics
    #[arg(long, global = true)]
    no_judge: bool,

    /// Phrase every agent reply must contain (repeatable)
    #[arg(long, value_name = "TEXT", global = true)]
    require: Vec<String>,

    /// Phrase no agent reply may contain (repeatable)
    #[arg(long, value_name = "TEXT", global = true)]
    forbid: Vec<String>,

    /// Regex every agent reply must match
    #[arg(long, value_name = "REGEX", global = true)]
    reply_pattern: Option<String>,

    /// Longest allowed agent reply, in words
    #[arg(long, value_name = "WORDS", global = true)]
    max_reply_words: Option<usize>,

    /// Fail replies that are empty or relay an endpoint error
    #[arg(long, global = true)]
    check_answered: bool,

    /// Also write conversations as a JSON dataset (keeps conversation ids)
    #[arg(long, global = true)]
    save_dataset: bool,

    /// Verbose mode
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch yesterday's conversations from Kustomer and score them
    Nightly {
        /// Maximum conversations to fetch
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Score a previously written conversation report or dataset
    Replay {
        /// Conversation report (CSV) or dataset (JSON/YAML)
        report: PathBuf,

        /// Exit non-zero on an empty report or any failing conversation
        #[arg(long)]
        fail_on_error: bool,
    },

    /// Play scripted customers against the chatbot
    Simulate {
        /// Scripts file (JSON or YAML); the stock scripts are used if omitted
        scripts: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn reply_checks(cli: &Cli) -> ReplyChecks {
    ReplyChecks {
        require: cli.require.clone(),
        forbid: cli.forbid.clone(),
        pattern: cli.reply_pattern.clone(),
        max_words: cli.max_reply_words,
        answered: cli.check_answered,
    }
}

fn build_scorer(cli: &Cli, config: &AppConfig) -> Result<MetricScorer> {
    let checks = reply_checks(cli);
    let mut scorer = MetricScorer::new().metrics(checks.metrics()?);

    if cli.no_judge {
        anyhow::ensure!(
            !checks.is_empty(),
            "--no-judge needs at least one reply check (--require, --forbid, ...)"
        );
    } else {
        let rubrics = match &cli.rubrics {
            Some(path) => Rubric::load_all(path)
                .with_context(|| format!("failed to load rubrics from {}", path.display()))?,
            None => default_rubrics(),
        };
        let judge: Arc<dyn Judge> = Arc::new(config.judge.build().context(
            "scoring needs a judge; set JUDGE_API_KEY, or pass --no-judge or --skip-scoring",
        )?);
        info!(model = judge.model_name(), rubrics = rubrics.len(), "judge enabled");
        scorer = scorer.metrics(rubric_metrics(rubrics, judge));
    }
    info!(metrics = scorer.metric_set().len(), "scoring enabled");

    let mut options = ScoreOptions::new().concurrency(cli.concurrency);
    if let Some(secs) = cli.timeout {
        options = options.timeout(Duration::from_secs(secs));
    }
    Ok(scorer.options(options))
}

fn print_output(output: &RunOutput) {
    if let Some(path) = &output.conversations_path {
        println!("Wrote conversations to {}", path.display());
    }
    if let Some(path) = &output.dataset_path {
        println!("Wrote dataset to {}", path.display());
    }
    if let Some(report) = &output.report {
        println!("{}", report.to_text());
    }
    if let Some(path) = &output.results_path {
        println!("Wrote evaluation results to {}", path.display());
    }
}

fn load_scripts(path: Option<&Path>) -> Result<Vec<ConversationScript>> {
    match path {
        Some(path) => ConversationScript::load_all(path)
            .with_context(|| format!("failed to load scripts from {}", path.display())),
        None => Ok(default_scripts()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::from_env();
    let scorer = if cli.skip_scoring {
        None
    } else {
        Some(build_scorer(&cli, &config)?)
    };
    let scorer_ref = scorer.as_ref().map(|s| s as &dyn Scorer);
    let mut options = RunOptions::new(&cli.output_dir, config.app_url.clone());
    if cli.save_dataset {
        options = options.with_dataset();
    }

    match &cli.command {
        Commands::Nightly { limit } => {
            let kustomer = config
                .require_kustomer()
                .context("nightly needs Kustomer credentials")?;
            let client = KustomerClient::new(kustomer.clone())?;
            let filter = SearchFilter::yesterday()
                .for_config(kustomer)
                .with_limit(*limit);

            let output =
                pipeline::nightly(&client, &filter, cli.concurrency, scorer_ref, &options)
                    .await
                    .context("nightly run failed")?;
            match output {
                Some(output) => print_output(&output),
                None => println!("No conversations found. Exiting."),
            }
        }

        Commands::Replay {
            report,
            fail_on_error,
        } => {
            let scorer = scorer_ref.context("replay only scores; drop --skip-scoring")?;
            let options = if *fail_on_error {
                options.fail_on_error()
            } else {
                options
            };
            let output = pipeline::replay(report, scorer, &options)
                .await
                .with_context(|| format!("failed to replay {}", report.display()))?;
            print_output(&output);
            if *fail_on_error {
                output.ensure_passed()?;
            }
        }

        Commands::Simulate { scripts } => {
            let scripts = load_scripts(scripts.as_deref())?;
            let simulator =
                ScriptedSimulator::new(Arc::new(ChatbotClient::new(config.chatbot.clone())?));
            let output = pipeline::simulate(&simulator, &scripts, scorer_ref, &options)
                .await
                .context("simulation failed")?;
            print_output(&output);
        }
    }

    Ok(())
}
