//! In-memory stream bus backend
//!
//! Simulates consumer groups over a ring-buffered `VecDeque`:
//! per-group cursor, per-consumer pending, blocking reads via `Notify`.
//!
//! ## Limitations
//!
//! Suitable for development, tests, and single-process deployments.
//! A process crash loses all entries; for durability use the Redis
//! backend.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::backend::{BusBackend, EntryFields, FieldValue, StreamEntry, StreamStats};
use super::error::BusError;

/// Default ring cap, matching the Redis MAXLEN
const DEFAULT_MAX_LEN: usize = 100_000;

/// Entry retained in the ring
#[derive(Clone)]
struct StoredEntry {
    id: u64,
    fields: EntryFields,
}

/// Consumer group state: one cursor, per-entry pending assignment
#[derive(Default)]
struct GroupState {
    /// Highest entry id delivered to any consumer of this group
    cursor: u64,
    /// Delivered-but-unacked entries: id -> consumer name
    pending: BTreeMap<u64, String>,
}

struct StreamState {
    entries: VecDeque<StoredEntry>,
    groups: HashMap<String, GroupState>,
    next_id: u64,
    max_len: usize,
}

impl StreamState {
    fn new(max_len: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            groups: HashMap::new(),
            next_id: 1,
            max_len,
        }
    }

    /// Trim to the ring cap, dropping pending references to evicted
    /// entries (accepted backpressure mode)
    fn trim(&mut self) {
        while self.entries.len() > self.max_len {
            if let Some(evicted) = self.entries.pop_front() {
                for group in self.groups.values_mut() {
                    group.pending.remove(&evicted.id);
                }
            }
        }
    }
}

struct SharedState {
    streams: RwLock<HashMap<String, StreamState>>,
    notifiers: RwLock<HashMap<String, Arc<Notify>>>,
    max_len: usize,
}

/// In-memory stream bus backend
pub struct MemoryBusBackend {
    state: Arc<SharedState>,
}

impl Default for MemoryBusBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBusBackend {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LEN)
    }

    /// Create with a custom ring cap (small caps exercise eviction)
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            state: Arc::new(SharedState {
                streams: RwLock::new(HashMap::new()),
                notifiers: RwLock::new(HashMap::new()),
                max_len,
            }),
        }
    }

    fn notifier(&self, stream: &str) -> Arc<Notify> {
        {
            let notifiers = self.state.notifiers.read();
            if let Some(n) = notifiers.get(stream) {
                return Arc::clone(n);
            }
        }
        let mut notifiers = self.state.notifiers.write();
        if let Some(n) = notifiers.get(stream) {
            return Arc::clone(n);
        }
        let n = Arc::new(Notify::new());
        notifiers.insert(stream.to_string(), Arc::clone(&n));
        n
    }

    /// Deliver up to `count` entries past the group cursor, marking each
    /// pending for `consumer`. Returns an error if the group is unknown.
    fn take_new(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, BusError> {
        let mut streams = self.state.streams.write();
        let stream_state = streams
            .get_mut(stream)
            .ok_or_else(|| BusError::ConsumerGroup(format!("no such group: {group}")))?;
        if !stream_state.groups.contains_key(group) {
            return Err(BusError::ConsumerGroup(format!("no such group: {group}")));
        }

        let cursor = stream_state.groups[group].cursor;
        let mut taken = Vec::new();
        for entry in &stream_state.entries {
            if taken.len() >= count {
                break;
            }
            if entry.id > cursor {
                taken.push(entry.clone());
            }
        }

        let group_state = stream_state
            .groups
            .get_mut(group)
            .ok_or_else(|| BusError::ConsumerGroup(format!("no such group: {group}")))?;
        for entry in &taken {
            group_state.pending.insert(entry.id, consumer.to_string());
            group_state.cursor = entry.id;
        }

        Ok(taken.into_iter().map(to_stream_entry).collect())
    }
}

fn to_stream_entry(entry: StoredEntry) -> StreamEntry {
    let fields = entry
        .fields
        .into_iter()
        .map(|(k, v)| (k, FieldValue::Text(v)))
        .collect();
    StreamEntry {
        id: entry.id.to_string(),
        fields,
    }
}

#[async_trait]
impl BusBackend for MemoryBusBackend {
    async fn publish(&self, stream: &str, fields: &EntryFields) -> Result<String, BusError> {
        let ids = self.publish_batch(stream, std::slice::from_ref(fields)).await?;
        Ok(ids.into_iter().next().unwrap_or_default())
    }

    async fn publish_batch(
        &self,
        stream: &str,
        batch: &[EntryFields],
    ) -> Result<Vec<String>, BusError> {
        let ids = {
            let mut streams = self.state.streams.write();
            let stream_state = streams
                .entry(stream.to_string())
                .or_insert_with(|| StreamState::new(self.state.max_len));

            let mut ids = Vec::with_capacity(batch.len());
            for fields in batch {
                let id = stream_state.next_id;
                stream_state.next_id += 1;
                stream_state.entries.push_back(StoredEntry {
                    id,
                    fields: fields.clone(),
                });
                ids.push(id.to_string());
            }
            stream_state.trim();
            ids
        };

        // Wake all blocked readers
        self.notifier(stream).notify_waiters();

        Ok(ids)
    }

    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), BusError> {
        let mut streams = self.state.streams.write();
        let stream_state = streams
            .entry(stream.to_string())
            .or_insert_with(|| StreamState::new(self.state.max_len));
        stream_state.groups.entry(group.to_string()).or_default();
        Ok(())
    }

    async fn read_new(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<StreamEntry>, BusError> {
        let deadline = Instant::now() + Duration::from_millis(block_ms);

        loop {
            let taken = self.take_new(stream, group, consumer, count)?;
            if !taken.is_empty() || block_ms == 0 {
                return Ok(taken);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Vec::new());
            }

            let notifier = self.notifier(stream);
            let _ = tokio::time::timeout(remaining, notifier.notified()).await;
        }
    }

    async fn read_pending(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, BusError> {
        let streams = self.state.streams.read();
        let stream_state = match streams.get(stream) {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };
        let group_state = match stream_state.groups.get(group) {
            Some(g) => g,
            None => return Ok(Vec::new()),
        };

        let mut entries = Vec::new();
        for (&id, owner) in &group_state.pending {
            if entries.len() >= count {
                break;
            }
            if owner != consumer {
                continue;
            }
            // Evicted entries silently drop out of pending on trim;
            // anything still referenced here is in the ring.
            if let Some(entry) = stream_state.entries.iter().find(|e| e.id == id) {
                entries.push(to_stream_entry(entry.clone()));
            }
        }

        Ok(entries)
    }

    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), BusError> {
        let id: u64 = id
            .parse()
            .map_err(|_| BusError::Stream(format!("invalid entry id: {id}")))?;

        let mut streams = self.state.streams.write();
        let stream_state = streams
            .get_mut(stream)
            .ok_or_else(|| BusError::Stream(format!("stream not found: {stream}")))?;
        let group_state = stream_state
            .groups
            .get_mut(group)
            .ok_or_else(|| BusError::ConsumerGroup(format!("no such group: {group}")))?;

        group_state.pending.remove(&id);
        Ok(())
    }

    async fn stats(&self, stream: &str, group: &str) -> Result<StreamStats, BusError> {
        let streams = self.state.streams.read();
        let stream_state = match streams.get(stream) {
            Some(s) => s,
            None => return Ok(StreamStats::default()),
        };
        let group_state = match stream_state.groups.get(group) {
            Some(g) => g,
            None => {
                return Ok(StreamStats {
                    length: stream_state.entries.len() as u64,
                    ..Default::default()
                });
            }
        };

        let consumers = group_state
            .pending
            .values()
            .collect::<std::collections::HashSet<_>>()
            .len() as u64;

        Ok(StreamStats {
            length: stream_state.entries.len() as u64,
            pending: group_state.pending.len() as u64,
            consumers,
        })
    }

    async fn health_check(&self) -> Result<(), BusError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(url: &str) -> EntryFields {
        vec![
            ("headline".to_string(), "테스트".to_string()),
            ("article_url".to_string(), url.to_string()),
        ]
    }

    #[tokio::test]
    async fn test_publish_read_ack() {
        let bus = MemoryBusBackend::new();
        bus.ensure_group("s", "g").await.unwrap();

        let ids = bus.publish_batch("s", &[fields("/a"), fields("/b")]).await.unwrap();
        assert_eq!(ids, vec!["1", "2"]);

        let entries = bus.read_new("s", "g", "c1", 10, 0).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].field_text("article_url"), "/a");

        for entry in &entries {
            bus.ack("s", "g", &entry.id).await.unwrap();
        }

        let stats = bus.stats("s", "g").await.unwrap();
        assert_eq!(stats.length, 2);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_groups_have_independent_cursors() {
        let bus = MemoryBusBackend::new();
        bus.ensure_group("s", "g1").await.unwrap();
        bus.ensure_group("s", "g2").await.unwrap();

        bus.publish("s", &fields("/a")).await.unwrap();

        let g1 = bus.read_new("s", "g1", "c", 10, 0).await.unwrap();
        let g2 = bus.read_new("s", "g2", "c", 10, 0).await.unwrap();
        assert_eq!(g1.len(), 1);
        assert_eq!(g2.len(), 1);

        // Same group does not see the entry twice
        let again = bus.read_new("s", "g1", "c", 10, 0).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_pending_replayed_until_acked() {
        let bus = MemoryBusBackend::new();
        bus.ensure_group("s", "g").await.unwrap();
        bus.publish("s", &fields("/a")).await.unwrap();

        let entries = bus.read_new("s", "g", "c1", 10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);

        // Unacked: replayed to the same consumer
        let pending = bus.read_pending("s", "g", "c1", 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, entries[0].id);

        // Pending is per consumer identity
        let other = bus.read_pending("s", "g", "c2", 10).await.unwrap();
        assert!(other.is_empty());

        bus.ack("s", "g", &entries[0].id).await.unwrap();
        let drained = bus.read_pending("s", "g", "c1", 10).await.unwrap();
        assert!(drained.is_empty());
    }

    #[tokio::test]
    async fn test_ring_eviction_drops_pending() {
        let bus = MemoryBusBackend::with_max_len(2);
        bus.ensure_group("s", "g").await.unwrap();

        bus.publish("s", &fields("/a")).await.unwrap();
        let first = bus.read_new("s", "g", "c", 1, 0).await.unwrap();
        assert_eq!(first.len(), 1);

        // Push the first entry out of the ring
        bus.publish("s", &fields("/b")).await.unwrap();
        bus.publish("s", &fields("/c")).await.unwrap();

        let pending = bus.read_pending("s", "g", "c", 10).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_read_new_requires_group() {
        let bus = MemoryBusBackend::new();
        bus.publish("s", &fields("/a")).await.unwrap();
        let result = bus.read_new("s", "missing", "c", 1, 0).await;
        assert!(matches!(result, Err(BusError::ConsumerGroup(_))));
    }

    #[tokio::test]
    async fn test_blocking_read_wakes_on_publish() {
        let bus = Arc::new(MemoryBusBackend::new());
        bus.ensure_group("s", "g").await.unwrap();

        let reader = Arc::clone(&bus);
        let handle =
            tokio::spawn(async move { reader.read_new("s", "g", "c", 10, 2000).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        bus.publish("s", &fields("/a")).await.unwrap();

        let entries = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_group_is_idempotent() {
        let bus = MemoryBusBackend::new();
        bus.ensure_group("s", "g").await.unwrap();
        bus.ensure_group("s", "g").await.unwrap();

        bus.publish("s", &fields("/a")).await.unwrap();
        // Re-ensuring must not reset the cursor
        let entries = bus.read_new("s", "g", "c", 10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
        bus.ensure_group("s", "g").await.unwrap();
        let again = bus.read_new("s", "g", "c", 10, 0).await.unwrap();
        assert!(again.is_empty());
    }
}
