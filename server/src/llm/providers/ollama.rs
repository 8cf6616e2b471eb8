//! Local-model provider (Ollama or vLLM serving an OpenAI-compatible API)
//!
//! Local reasoning models wrap their output in prose, fences, or
//! `<think>` blocks, so no server-side JSON mode is requested; the
//! response is parsed leniently instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::super::{LlmError, SentimentLlm, extract_json};
use crate::core::config::LlmConfig;

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// Registry constructor
    pub fn create(config: &LlmConfig) -> Result<Arc<dyn SentimentLlm>, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Arc::new(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }))
    }
}

#[async_trait]
impl SentimentLlm for OllamaProvider {
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        let system = format!(
            "You are a helpful assistant. Always respond with valid JSON \
             only, matching this schema: {schema}"
        );

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.3,
            "max_tokens": 2048,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let data: serde_json::Value = response.json().await?;
        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Provider("missing message content".into()))?;

        extract_json(content)
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}
