//! LLM error types

use thiserror::Error;

/// Error type for sentiment LLM calls
#[derive(Error, Debug)]
pub enum LlmError {
    /// HTTP transport error (timeout, connection, non-2xx)
    #[error("request error: {0}")]
    Request(String),

    /// Provider returned no parseable JSON
    #[error("parse error: {0}")]
    Parse(String),

    /// Provider returned an unexpected response shape
    #[error("provider error: {0}")]
    Provider(String),

    /// Unknown provider or invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Request(err.to_string())
    }
}
