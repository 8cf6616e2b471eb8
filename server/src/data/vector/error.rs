//! Vector sink error types

use thiserror::Error;

/// Error type for embedding and vector-store operations
#[derive(Error, Debug)]
pub enum VectorError {
    /// Embedding or vector-store endpoint unreachable
    #[error("vector sink not ready: {0}")]
    NotReady(String),

    /// HTTP transport error
    #[error("request error: {0}")]
    Request(String),

    /// Unexpected response shape
    #[error("response error: {0}")]
    Response(String),
}

impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        VectorError::Request(err.to_string())
    }
}
