//! LLM judge client.
//!
//! Rubric metrics delegate the actual grading to a [`Judge`]. The judge sees
//! a prompt and answers with a JSON object; what the rubric means is entirely
//! up to the model.

use crate::error::{EvalError, EvalResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default chat-completions endpoint base.
pub const DEFAULT_JUDGE_BASE_URL: &str = "https://api.openai.com/v1";

/// Default judge model.
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4o";

/// Token usage reported by the judge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub prompt_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
    /// Total tokens.
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create new token usage.
    #[must_use]
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    /// Calculate cost from per-token prices.
    #[must_use]
    pub fn calculate_cost(&self, pricing: &Pricing) -> f64 {
        (self.prompt_tokens as f64 * pricing.input_per_token)
            + (self.completion_tokens as f64 * pricing.output_per_token)
    }
}

/// Per-token prices in dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    /// Price of one prompt token.
    pub input_per_token: f64,
    /// Price of one completion token.
    pub output_per_token: f64,
}

impl Pricing {
    /// Prices given per million tokens.
    #[must_use]
    pub fn per_million(input: f64, output: f64) -> Self {
        Self {
            input_per_token: input / 1_000_000.0,
            output_per_token: output / 1_000_000.0,
        }
    }

    /// Known list prices for a model name, falling back to gpt-4o prices.
    #[must_use]
    pub fn for_model(model: &str) -> Self {
        match model {
            m if m.starts_with("gpt-4o-mini") => Self::per_million(0.15, 0.60),
            m if m.starts_with("gpt-4.1-mini") => Self::per_million(0.40, 1.60),
            m if m.starts_with("gpt-4.1") => Self::per_million(2.00, 8.00),
            _ => Self::per_million(2.50, 10.00),
        }
    }
}

/// A judge reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeResponse {
    /// Raw message content.
    pub content: String,
    /// Token usage.
    pub usage: TokenUsage,
    /// Model that answered.
    pub model: String,
}

impl JudgeResponse {
    /// Parse the content as JSON.
    pub fn as_json(&self) -> EvalResult<serde_json::Value> {
        Ok(serde_json::from_str(&self.content)?)
    }
}

/// Something that can grade a prompt.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Send a prompt and get a JSON reply.
    async fn judge(&self, prompt: String) -> EvalResult<JudgeResponse>;

    /// Model name.
    fn model_name(&self) -> &str;

    /// Per-token prices.
    fn pricing(&self) -> Pricing;
}

/// Judge backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiJudge {
    api_key: String,
    model: String,
    base_url: String,
    pricing: Pricing,
    client: reqwest::Client,
}

impl OpenAiJudge {
    /// Create a judge for the given key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> EvalResult<Self> {
        let model = model.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| EvalError::judge(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            pricing: Pricing::for_model(&model),
            model,
            base_url: DEFAULT_JUDGE_BASE_URL.to_string(),
            client,
        })
    }

    /// Set the endpoint base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the per-token prices.
    #[must_use]
    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }
}

#[async_trait]
impl Judge for OpenAiJudge {
    async fn judge(&self, prompt: String) -> EvalResult<JudgeResponse> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert evaluator of customer support conversations. Respond only with valid JSON."
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": 0.0,
            "response_format": { "type": "json_object" }
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EvalError::judge(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvalError::judge(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EvalError::judge(format!("invalid response body: {e}")))?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| EvalError::judge("response is missing message content"))?
            .to_string();

        let usage_data = &data["usage"];
        let usage = TokenUsage::new(
            usage_data["prompt_tokens"].as_u64().unwrap_or(0),
            usage_data["completion_tokens"].as_u64().unwrap_or(0),
        );

        debug!(model = %self.model, ?usage, "judge replied");

        Ok(JudgeResponse {
            content,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn pricing(&self) -> Pricing {
        self.pricing
    }
}
