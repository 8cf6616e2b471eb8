//! OpenAI-compatible provider (OpenAI, vLLM, DeepSeek API)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::super::{LlmError, SentimentLlm, extract_json};
use crate::core::config::LlmConfig;

/// Chat-completions provider with JSON response mode
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    /// Registry constructor
    pub fn create(config: &LlmConfig) -> Result<Arc<dyn SentimentLlm>, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Arc::new(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }))
    }
}

#[async_trait]
impl SentimentLlm for OpenAiProvider {
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        let system = format!(
            "You are a helpful assistant. Always respond with valid JSON \
             matching this schema: {schema}"
        );

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.3,
            "max_tokens": 2048,
            "response_format": {"type": "json_object"},
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let data: serde_json::Value = response.json().await?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Provider("missing message content".into()))?;

        extract_json(content)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
