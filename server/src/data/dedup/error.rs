//! Dedup error types

use thiserror::Error;

/// Error type for dedup window operations
#[derive(Error, Debug)]
pub enum DedupError {
    /// Connection error (Redis pool or network)
    #[error("connection error: {0}")]
    Connection(String),

    /// Set command error
    #[error("command error: {0}")]
    Command(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<deadpool_redis::PoolError> for DedupError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        DedupError::Connection(err.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for DedupError {
    fn from(err: deadpool_redis::redis::RedisError) -> Self {
        DedupError::Command(err.to_string())
    }
}
