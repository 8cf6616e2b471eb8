//! Dedup backend trait definition

use std::time::Duration;

use async_trait::async_trait;

use super::error::DedupError;

/// Set-membership backend for the dedup window
///
/// The window logic (day keys, fail-open policy) lives in the service;
/// backends only provide TTL'd set membership.
#[async_trait]
pub trait DedupBackend: Send + Sync {
    /// True if `member` is present in any of the given set keys
    async fn contains(&self, keys: &[String], member: &str) -> Result<bool, DedupError>;

    /// Add `member` to the set at `key` and refresh the key's TTL
    async fn add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), DedupError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), DedupError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
