//! Sentiment LLM abstraction
//!
//! `SentimentLlm` is the one contract the analyzer depends on:
//! structured JSON generation against a schema. Providers live behind a
//! plain name-keyed registry table and are constructed only when
//! selected, so adding a provider never touches the call sites.

mod error;
pub mod providers;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::LlmError;

use crate::core::config::LlmConfig;

/// Structured-output LLM contract
#[async_trait]
pub trait SentimentLlm: Send + Sync {
    /// Generate a JSON object answering `prompt`, shaped by `schema`
    ///
    /// Implementations may enforce the schema server-side or embed it in
    /// the instruction; either way the caller validates the fields it
    /// needs and must tolerate failure.
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError>;

    /// Provider identifier (logging/statistics)
    fn provider_name(&self) -> &'static str;
}

type ProviderCtor = fn(&LlmConfig) -> Result<Arc<dyn SentimentLlm>, LlmError>;

/// Provider registry: a plain table keyed by name
///
/// Construction happens at lookup time, never at registration, so
/// provider modules stay independent of each other.
const PROVIDERS: &[(&str, ProviderCtor)] = &[
    ("openai", providers::openai::OpenAiProvider::create),
    ("ollama", providers::ollama::OllamaProvider::create),
];

/// Build the configured provider
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn SentimentLlm>, LlmError> {
    let name = config.provider.to_ascii_lowercase();
    for (key, ctor) in PROVIDERS {
        if *key == name {
            return ctor(config);
        }
    }

    let available: Vec<&str> = PROVIDERS.iter().map(|(key, _)| *key).collect();
    Err(LlmError::Config(format!(
        "LLM provider '{}' not registered. Available: {:?}",
        config.provider, available
    )))
}

/// Extract a JSON object from free-form model output
///
/// Tolerates markdown fences, `<think>` blocks, and surrounding prose;
/// falls back to the first balanced `{...}` pair.
pub(crate) fn extract_json(text: &str) -> Result<serde_json::Value, LlmError> {
    let text = strip_think_blocks(text);
    let text = text.trim();

    // ```json ... ``` or ``` ... ``` fenced blocks
    if let Some(inner) = fenced_block(text, "```json").or_else(|| fenced_block(text, "```")) {
        let inner = inner.trim();
        if inner.starts_with('{')
            && let Ok(value) = serde_json::from_str(inner)
        {
            return Ok(value);
        }
    }

    // First balanced { ... } pair
    if let Some(candidate) = balanced_object(text)
        && let Ok(value) = serde_json::from_str(candidate)
    {
        return Ok(value);
    }

    serde_json::from_str(text).map_err(|_| {
        let preview: String = text.chars().take(200).collect();
        LlmError::Parse(format!("no JSON object in response: {preview}"))
    })
}

fn strip_think_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

fn fenced_block<'a>(text: &'a str, fence: &str) -> Option<&'a str> {
    let start = text.find(fence)? + fence.len();
    let end = text[start..].find("```")?;
    Some(&text[start..start + end])
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#"{"score": 70, "reason": "호재"}"#).unwrap();
        assert_eq!(value["score"], 70);
    }

    #[test]
    fn test_extract_fenced_json() {
        let value = extract_json("```json\n{\"score\": 30}\n```").unwrap();
        assert_eq!(value["score"], 30);

        let value = extract_json("```\n{\"score\": 30}\n```").unwrap();
        assert_eq!(value["score"], 30);
    }

    #[test]
    fn test_extract_json_with_prose_and_think() {
        let text = "<think>시황을 고려하면...</think>분석 결과: {\"score\": 85, \"reason\": \"수주\"} 입니다.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["score"], 85);
    }

    #[test]
    fn test_extract_nested_object() {
        let value = extract_json("x {\"a\": {\"b\": 1}} y").unwrap();
        assert_eq!(value["a"]["b"], 1);
    }

    #[test]
    fn test_extract_rejects_garbage() {
        assert!(extract_json("no json here").is_err());
    }

    #[test]
    fn test_registry_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(create_provider(&config), Err(LlmError::Config(_))));
    }

    #[test]
    fn test_registry_builds_known_providers() {
        for name in ["openai", "ollama"] {
            let config = LlmConfig {
                provider: name.to_string(),
                ..LlmConfig::default()
            };
            let provider = create_provider(&config).unwrap();
            assert_eq!(provider.provider_name(), name);
        }
    }
}
