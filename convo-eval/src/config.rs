//! Environment configuration.

use crate::pipeline::{PipelineError, PipelineResult};
use convo_eval_evals::judge::{DEFAULT_JUDGE_BASE_URL, DEFAULT_JUDGE_MODEL};
use convo_eval_evals::{OpenAiJudge, DEFAULT_CONVERSATION_URL_BASE};
use convo_eval_sources::{ChatbotConfig, KustomerConfig};
use tracing::debug;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load a `.env` file from the working directory or its parents, if any.
///
/// Variables already set in the environment win.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => debug!(error = %e, "could not load .env"),
    }
}

/// Judge model settings.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// API key.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Endpoint base URL.
    pub base_url: String,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_JUDGE_MODEL.to_string(),
            base_url: DEFAULT_JUDGE_BASE_URL.to_string(),
        }
    }
}

impl JudgeConfig {
    /// Load from environment variables.
    ///
    /// Looks for:
    /// - `JUDGE_API_KEY`, falling back to `OPENAI_API_KEY`
    /// - `JUDGE_MODEL`
    /// - `JUDGE_BASE_URL`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env_var("JUDGE_API_KEY").or_else(|| env_var("OPENAI_API_KEY")),
            model: env_var("JUDGE_MODEL").unwrap_or(defaults.model),
            base_url: env_var("JUDGE_BASE_URL").unwrap_or(defaults.base_url),
        }
    }

    /// Build the judge client.
    pub fn build(&self) -> PipelineResult<OpenAiJudge> {
        let api_key = self
            .api_key
            .clone()
            .ok_or(PipelineError::MissingConfig("JUDGE_API_KEY"))?;
        Ok(OpenAiJudge::new(api_key, self.model.clone())?.with_base_url(self.base_url.clone()))
    }
}

/// Everything the pipelines read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Kustomer settings, absent when `KUSTOMER_API_KEY` is not set.
    pub kustomer: Option<KustomerConfig>,
    /// Judge settings.
    pub judge: JudgeConfig,
    /// Chatbot settings.
    pub chatbot: ChatbotConfig,
    /// Base URL of conversation links in the results table.
    pub app_url: String,
}

impl AppConfig {
    /// Load from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            kustomer: KustomerConfig::from_env().ok(),
            judge: JudgeConfig::from_env(),
            chatbot: ChatbotConfig::from_env(),
            app_url: env_var("KUSTOMER_APP_URL")
                .unwrap_or_else(|| DEFAULT_CONVERSATION_URL_BASE.to_string()),
        }
    }

    /// Kustomer settings, or an error naming the missing variable.
    pub fn require_kustomer(&self) -> PipelineResult<&KustomerConfig> {
        self.kustomer
            .as_ref()
            .ok_or(PipelineError::MissingConfig("KUSTOMER_API_KEY"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_config_defaults_and_missing_key() {
        let config = JudgeConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert!(matches!(
            config.build(),
            Err(PipelineError::MissingConfig("JUDGE_API_KEY"))
        ));
    }

    #[test]
    fn test_judge_config_builds_with_key() {
        let config = JudgeConfig {
            api_key: Some("sk-test".to_string()),
            ..JudgeConfig::default()
        };
        let judge = config.build().unwrap();
        assert_eq!(convo_eval_evals::Judge::model_name(&judge), "gpt-4o");
    }

    #[test]
    fn test_require_kustomer() {
        let config = AppConfig {
            kustomer: None,
            judge: JudgeConfig::default(),
            chatbot: ChatbotConfig::default(),
            app_url: DEFAULT_CONVERSATION_URL_BASE.to_string(),
        };
        assert!(config.require_kustomer().is_err());

        let config = AppConfig {
            kustomer: Some(KustomerConfig::new("k")),
            ..config
        };
        assert_eq!(config.require_kustomer().unwrap().api_key, "k");
    }
}
