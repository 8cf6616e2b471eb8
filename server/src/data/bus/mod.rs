//! Stream bus
//!
//! Append-only multi-consumer log with pluggable backends:
//! - In-memory (default) - local-only, for development and tests
//! - Redis Streams (optional) - durable across restarts
//!
//! Independent consumer groups each receive every entry once (absent
//! crashes); entries stay pending to their assigned consumer until
//! acknowledged. The ring cap bounds retention: under pressure the
//! oldest entries are evicted even if unacked.

mod backend;
mod error;
mod memory;
mod redis;

use std::sync::Arc;

pub use backend::{BusBackend, EntryFields, FieldValue, StreamEntry, StreamStats};
pub use error::BusError;
pub use memory::MemoryBusBackend;

use crate::core::config::{InfraBackendType, InfraConfig};

/// Stream bus service delegating to the configured backend
pub struct NewsBus {
    backend: Arc<dyn BusBackend>,
}

impl NewsBus {
    /// Create with the in-memory backend
    pub fn memory() -> Self {
        Self {
            backend: Arc::new(MemoryBusBackend::new()),
        }
    }

    /// Create with an explicit backend (tests inject small ring caps)
    pub fn with_backend(backend: Arc<dyn BusBackend>) -> Self {
        Self { backend }
    }

    /// Create from infra configuration
    pub async fn from_config(config: &InfraConfig) -> Result<Self, BusError> {
        let backend: Arc<dyn BusBackend> = match config.backend {
            InfraBackendType::Memory => Arc::new(MemoryBusBackend::new()),
            InfraBackendType::Redis => {
                let url = config.redis_url.as_ref().ok_or_else(|| {
                    BusError::Config("redis_url required for Redis backend".into())
                })?;
                Arc::new(redis::RedisBusBackend::new(url).await?)
            }
        };

        Ok(Self { backend })
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Append one entry
    pub async fn publish(&self, stream: &str, fields: &EntryFields) -> Result<String, BusError> {
        self.backend.publish(stream, fields).await
    }

    /// Append a batch of entries in one round trip
    pub async fn publish_batch(
        &self,
        stream: &str,
        batch: &[EntryFields],
    ) -> Result<Vec<String>, BusError> {
        self.backend.publish_batch(stream, batch).await
    }

    /// Idempotently create a consumer group
    pub async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), BusError> {
        self.backend.ensure_group(stream, group).await
    }

    /// Read entries newer than the group cursor
    pub async fn read_new(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<StreamEntry>, BusError> {
        self.backend
            .read_new(stream, group, consumer, count, block_ms)
            .await
    }

    /// Replay unacknowledged entries for this consumer
    pub async fn read_pending(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, BusError> {
        self.backend.read_pending(stream, group, consumer, count).await
    }

    /// Acknowledge an entry
    pub async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), BusError> {
        self.backend.ack(stream, group, id).await
    }

    /// Stream statistics for monitoring
    pub async fn stats(&self, stream: &str, group: &str) -> Result<StreamStats, BusError> {
        self.backend.stats(stream, group).await
    }

    /// Health check
    pub async fn health_check(&self) -> Result<(), BusError> {
        self.backend.health_check().await
    }
}
