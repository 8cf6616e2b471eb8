//! Redis dedup backend
//!
//! Day-keyed SETs probed with pipelined `SISMEMBER`; writes pipeline
//! `SADD` + `EXPIRE` so the TTL is refreshed on every mark.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};

use super::backend::DedupBackend;
use super::error::DedupError;

/// Redis dedup backend
pub struct RedisDedupBackend {
    pool: Pool,
}

impl RedisDedupBackend {
    /// Create a new Redis dedup backend and validate the connection
    pub async fn new(redis_url: &str) -> Result<Self, DedupError> {
        let mut config = Config::from_url(redis_url);
        config.pool = Some(deadpool_redis::PoolConfig {
            max_size: 16,
            timeouts: deadpool_redis::Timeouts {
                wait: Some(Duration::from_secs(5)),
                create: Some(Duration::from_secs(5)),
                recycle: Some(Duration::from_secs(5)),
            },
            ..Default::default()
        });

        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| DedupError::Connection(format!("Failed to create Redis pool: {e}")))?;

        let mut conn = pool
            .get()
            .await
            .map_err(|e| DedupError::Connection(format!("Failed to get Redis connection: {e}")))?;

        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| DedupError::Connection(format!("Redis PING failed: {e}")))?;

        tracing::debug!("Redis dedup backend connected");

        Ok(Self { pool })
    }
}

#[async_trait]
impl DedupBackend for RedisDedupBackend {
    async fn contains(&self, keys: &[String], member: &str) -> Result<bool, DedupError> {
        if keys.is_empty() {
            return Ok(false);
        }
        let mut conn = self.pool.get().await?;

        let mut pipe = deadpool_redis::redis::pipe();
        for key in keys {
            pipe.cmd("SISMEMBER").arg(key).arg(member);
        }

        let results: Vec<bool> = pipe.query_async(&mut conn).await?;
        Ok(results.into_iter().any(|hit| hit))
    }

    async fn add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), DedupError> {
        let mut conn = self.pool.get().await?;

        let mut pipe = deadpool_redis::redis::pipe();
        pipe.cmd("SADD").arg(key).arg(member).ignore();
        pipe.cmd("EXPIRE").arg(key).arg(ttl.as_secs()).ignore();

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DedupError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| DedupError::Connection(e.to_string()))?;

        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| DedupError::Connection(e.to_string()))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
