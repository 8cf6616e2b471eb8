//! Stream bus backend trait definition
//!
//! Defines the interface for the append-only news log (memory and Redis).
//! Delivery is at-least-once: entries stay pending to their assigned
//! consumer until acknowledged, and each consumer group holds an
//! independent cursor over the stream.

use std::borrow::Cow;
use std::collections::HashMap;

use async_trait::async_trait;

use super::error::BusError;

/// A single field value as returned by the substrate
///
/// The Redis client hands back either textual or byte-encoded values
/// depending on the reply path; consumers canonicalise to text at the
/// boundary instead of assuming one encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// View the value as text (lossy for non-UTF-8 bytes)
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s.as_str()),
            FieldValue::Bytes(b) => String::from_utf8_lossy(b),
        }
    }
}

/// Ordered field pairs published with an entry
pub type EntryFields = Vec<(String, String)>;

/// Entry read from a stream, addressed by its opaque id for ack
#[derive(Debug, Clone)]
pub struct StreamEntry {
    /// Monotonically increasing id assigned by the substrate
    pub id: String,
    pub fields: HashMap<String, FieldValue>,
}

impl StreamEntry {
    /// Field value as text, empty when absent
    pub fn field_text(&self, name: &str) -> String {
        self.fields
            .get(name)
            .map(|v| v.as_text().into_owned())
            .unwrap_or_default()
    }
}

/// Stream statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// Total entries currently retained in the stream
    pub length: u64,
    /// Entries delivered to the group but not yet acknowledged
    pub pending: u64,
    /// Consumers currently holding pending entries
    pub consumers: u64,
}

/// Stream bus backend trait
///
/// Both the in-memory and the Redis Streams backends implement this.
///
/// # Invariants
///
/// 1. Each group has an independent cursor; an entry is delivered to
///    each group exactly once absent consumer crashes.
/// 2. An entry stays pending to its assigned consumer until acked; a
///    restarted consumer drains pending before reading new entries.
/// 3. Under ring-buffer eviction unacked entries may be lost; drop is
///    preferred over unbounded growth.
#[async_trait]
pub trait BusBackend: Send + Sync {
    /// Append one entry, evicting the oldest past the ring cap
    ///
    /// Returns the assigned entry id.
    async fn publish(&self, stream: &str, fields: &EntryFields) -> Result<String, BusError>;

    /// Append a batch of entries in one round trip (pipelined)
    async fn publish_batch(
        &self,
        stream: &str,
        batch: &[EntryFields],
    ) -> Result<Vec<String>, BusError>;

    /// Idempotently create a consumer group starting from the beginning
    ///
    /// A duplicate-group error from the substrate is swallowed as success.
    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), BusError>;

    /// Read entries newer than the group cursor, blocking up to `block_ms`
    ///
    /// Returned entries become pending to `consumer` until acknowledged.
    async fn read_new(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<StreamEntry>, BusError>;

    /// Replay entries delivered to `consumer` that were never acknowledged
    async fn read_pending(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, BusError>;

    /// Acknowledge an entry, removing it from the group's pending list
    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), BusError>;

    /// Stream statistics for monitoring
    async fn stats(&self, stream: &str, group: &str) -> Result<StreamStats, BusError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), BusError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
