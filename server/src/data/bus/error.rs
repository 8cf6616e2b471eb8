//! Bus error types

use thiserror::Error;

/// Error type for stream bus operations
#[derive(Error, Debug)]
pub enum BusError {
    /// Connection error (Redis pool or network)
    #[error("connection error: {0}")]
    Connection(String),

    /// Stream operation error
    #[error("stream error: {0}")]
    Stream(String),

    /// Consumer group error
    #[error("consumer group error: {0}")]
    ConsumerGroup(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<deadpool_redis::PoolError> for BusError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        BusError::Connection(err.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for BusError {
    fn from(err: deadpool_redis::redis::RedisError) -> Self {
        BusError::Stream(err.to_string())
    }
}
