//! News deduplication over a 3-day sliding window
//!
//! Day-keyed fingerprint sets (`dedup:news:YYYYMMDD`, TTL 3 days);
//! membership checks span the three most recent days so duplicates
//! across a date boundary are still caught.
//!
//! Failure policy: any backend error fails **open**: the caller sees
//! "not duplicate" and nothing is marked. Preferring duplicate work
//! over losing novel articles during a substrate outage; the analyzer's
//! store check and the URL-keyed upsert absorb the duplicates.

mod backend;
mod error;
mod memory;
mod redis;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Local, NaiveDate};

pub use backend::DedupBackend;
pub use error::DedupError;
pub use memory::MemoryDedupBackend;

use crate::core::config::{InfraBackendType, InfraConfig};
use crate::core::constants::{DEDUP_KEY_PREFIX, DEDUP_TTL_SECS, DEDUP_WINDOW_DAYS};

/// Fingerprint a headline: first 12 hex chars of the MD5 over the
/// lowercased text with everything but alphanumerics and `_` stripped.
/// Collisions inside the window are acceptable; occasional silent
/// dedup is cheaper than duplicate LLM spend.
pub fn fingerprint(text: &str) -> String {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let digest = md5::compute(normalized.as_bytes());
    format!("{digest:x}")[..12].to_string()
}

/// Set key for one calendar day
fn day_key(date: NaiveDate) -> String {
    format!("{}{}", DEDUP_KEY_PREFIX, date.format("%Y%m%d"))
}

/// Keys for the probe window, today first
fn window_keys(today: NaiveDate) -> Vec<String> {
    (0..DEDUP_WINDOW_DAYS)
        .map(|d| {
            let date = today
                .checked_sub_days(Days::new(d as u64))
                .unwrap_or(today);
            day_key(date)
        })
        .collect()
}

/// Probabilistic dedup over the sliding window
pub struct Deduplicator {
    backend: Arc<dyn DedupBackend>,
}

impl Deduplicator {
    /// Create with the in-memory backend
    pub fn memory() -> Self {
        Self {
            backend: Arc::new(MemoryDedupBackend::new()),
        }
    }

    /// Create with an explicit backend
    pub fn with_backend(backend: Arc<dyn DedupBackend>) -> Self {
        Self { backend }
    }

    /// Create from infra configuration
    pub async fn from_config(config: &InfraConfig) -> Result<Self, DedupError> {
        let backend: Arc<dyn DedupBackend> = match config.backend {
            InfraBackendType::Memory => Arc::new(MemoryDedupBackend::new()),
            InfraBackendType::Redis => {
                let url = config.redis_url.as_ref().ok_or_else(|| {
                    DedupError::Config("redis_url required for Redis backend".into())
                })?;
                Arc::new(redis::RedisDedupBackend::new(url).await?)
            }
        };

        Ok(Self { backend })
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Probe and mark as one logical operation
    ///
    /// True iff the key was unseen in the window; marks today's set and
    /// refreshes its TTL on that path.
    pub async fn is_new(&self, key: &str) -> bool {
        self.is_new_on(key, Local::now().date_naive()).await
    }

    /// Membership check only, never marks
    pub async fn is_duplicate(&self, key: &str) -> bool {
        self.is_duplicate_on(key, Local::now().date_naive()).await
    }

    async fn is_new_on(&self, key: &str, today: NaiveDate) -> bool {
        let fp = fingerprint(key);
        let keys = window_keys(today);

        match self.backend.contains(&keys, &fp).await {
            Ok(true) => false,
            Ok(false) => {
                let ttl = Duration::from_secs(DEDUP_TTL_SECS);
                if let Err(e) = self.backend.add(&keys[0], &fp, ttl).await {
                    tracing::debug!(error = %e, "Failed to mark news as seen");
                }
                true
            }
            Err(e) => {
                // Fail open: never drop a potentially novel article
                // because the window store is down.
                tracing::debug!(error = %e, "Dedup probe failed, treating as novel");
                true
            }
        }
    }

    async fn is_duplicate_on(&self, key: &str, today: NaiveDate) -> bool {
        let fp = fingerprint(key);
        match self.backend.contains(&window_keys(today), &fp).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::debug!(error = %e, "Dedup probe failed, treating as novel");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fingerprint_is_stable_and_normalized() {
        let a = fingerprint("삼성전자 실적");
        let b = fingerprint("삼성전자  실적!!");
        let c = fingerprint("삼성전자 배당");

        assert_eq!(a.len(), 12);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fingerprint_case_insensitive() {
        assert_eq!(fingerprint("Samsung Up 5%"), fingerprint("samsung up 5%"));
    }

    #[test]
    fn test_window_keys_span_three_days() {
        let keys = window_keys(date(2025, 3, 1));
        assert_eq!(
            keys,
            vec![
                "dedup:news:20250301".to_string(),
                "dedup:news:20250228".to_string(),
                "dedup:news:20250227".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_is_new_marks_on_first_sight() {
        let dedup = Deduplicator::memory();

        assert!(dedup.is_new("https://example.com/a").await);
        assert!(!dedup.is_new("https://example.com/a").await);
        assert!(dedup.is_duplicate("https://example.com/a").await);
    }

    #[tokio::test]
    async fn test_is_duplicate_does_not_mark() {
        let dedup = Deduplicator::memory();

        assert!(!dedup.is_duplicate("https://example.com/a").await);
        assert!(!dedup.is_duplicate("https://example.com/a").await);
        assert!(dedup.is_new("https://example.com/a").await);
    }

    #[tokio::test]
    async fn test_cross_day_window() {
        let dedup = Deduplicator::memory();
        let d0 = date(2025, 3, 1);

        assert!(dedup.is_new_on("/a", d0).await);

        // Next two days still inside the window
        assert!(!dedup.is_new_on("/a", date(2025, 3, 2)).await);
        assert!(!dedup.is_new_on("/a", date(2025, 3, 3)).await);

        // Three days later the mark has rotated out
        assert!(dedup.is_new_on("/a", date(2025, 3, 4)).await);
    }

    #[tokio::test]
    async fn test_fails_open_on_backend_error() {
        struct FailingBackend;

        #[async_trait::async_trait]
        impl DedupBackend for FailingBackend {
            async fn contains(&self, _: &[String], _: &str) -> Result<bool, DedupError> {
                Err(DedupError::Connection("connection refused".into()))
            }
            async fn add(
                &self,
                _: &str,
                _: &str,
                _: Duration,
            ) -> Result<(), DedupError> {
                Err(DedupError::Connection("connection refused".into()))
            }
            async fn health_check(&self) -> Result<(), DedupError> {
                Err(DedupError::Connection("connection refused".into()))
            }
            fn backend_name(&self) -> &'static str {
                "failing"
            }
        }

        let dedup = Deduplicator::with_backend(Arc::new(FailingBackend));
        assert!(dedup.is_new("/a").await);
        assert!(dedup.is_new("/a").await);
        assert!(!dedup.is_duplicate("/a").await);
    }
}
