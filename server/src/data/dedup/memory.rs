//! In-memory dedup backend
//!
//! TTL'd sets over a `DashMap`; expiry is checked lazily on access.
//! Suitable for development and single-process deployments.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use super::backend::DedupBackend;
use super::error::DedupError;

struct SetEntry {
    members: HashSet<String>,
    expires_at: Instant,
}

/// In-memory dedup backend
#[derive(Default)]
pub struct MemoryDedupBackend {
    sets: DashMap<String, SetEntry>,
}

impl MemoryDedupBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupBackend for MemoryDedupBackend {
    async fn contains(&self, keys: &[String], member: &str) -> Result<bool, DedupError> {
        let now = Instant::now();
        for key in keys {
            if let Some(entry) = self.sets.get(key) {
                if entry.expires_at <= now {
                    continue;
                }
                if entry.members.contains(member) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), DedupError> {
        let now = Instant::now();
        let mut entry = self.sets.entry(key.to_string()).or_insert_with(|| SetEntry {
            members: HashSet::new(),
            expires_at: now + ttl,
        });

        if entry.expires_at <= now {
            entry.members.clear();
        }
        entry.members.insert(member.to_string());
        entry.expires_at = now + ttl;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DedupError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
