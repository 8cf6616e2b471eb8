//! Relational store
//!
//! Two narrow contracts over the embedded database:
//! - `SentimentStore` - idempotent persistence of analyzed headlines,
//!   keyed on `article_url`
//! - `UniverseSource` - the active ticker universe, refreshed per cycle
//!
//! Memory doubles back the pipeline tests.

mod error;
mod memory;
mod sqlite;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub use error::StoreError;
pub use memory::{MemorySentimentStore, StaticUniverse};
pub use sqlite::SqliteNewsStore;

/// Persisted sentiment row
///
/// Field bounds (headline ≤ 500, reason ≤ 2000, url ≤ 1000) are
/// enforced by the store on write.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentRecord {
    pub stock_code: String,
    pub news_date: NaiveDate,
    pub press: String,
    pub headline: String,
    pub sentiment_score: i32,
    pub sentiment_reason: String,
    pub article_url: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
}

/// Idempotent sentiment persistence, keyed on `article_url`
#[async_trait]
pub trait SentimentStore: Send + Sync {
    /// True if a row for this URL already exists (LLM-spend guard)
    async fn exists(&self, article_url: &str) -> Result<bool, StoreError>;

    /// Insert the record; a second save for the same URL is a no-op
    async fn save(&self, record: &SentimentRecord) -> Result<(), StoreError>;
}

/// Source of the active ticker universe (`code -> name`)
#[async_trait]
pub trait UniverseSource: Send + Sync {
    async fn active(&self) -> Result<BTreeMap<String, String>, StoreError>;
}
