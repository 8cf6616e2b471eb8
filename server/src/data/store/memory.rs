//! In-memory store doubles for tests and development

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::StoreError;
use super::{SentimentRecord, SentimentStore, UniverseSource};

/// In-memory sentiment store, idempotent on `article_url`
#[derive(Default)]
pub struct MemorySentimentStore {
    rows: RwLock<BTreeMap<String, SentimentRecord>>,
}

impl MemorySentimentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored rows, keyed by URL
    pub fn rows(&self) -> BTreeMap<String, SentimentRecord> {
        self.rows.read().clone()
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl SentimentStore for MemorySentimentStore {
    async fn exists(&self, article_url: &str) -> Result<bool, StoreError> {
        Ok(self.rows.read().contains_key(article_url))
    }

    async fn save(&self, record: &SentimentRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        rows.entry(record.article_url.clone())
            .or_insert_with(|| record.clone());
        Ok(())
    }
}

/// Fixed universe for tests
pub struct StaticUniverse {
    universe: BTreeMap<String, String>,
}

impl StaticUniverse {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            universe: pairs
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
        }
    }

    /// Empty universe
    pub fn empty() -> Self {
        Self {
            universe: BTreeMap::new(),
        }
    }
}

#[async_trait]
impl UniverseSource for StaticUniverse {
    async fn active(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self.universe.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn record(url: &str, score: i32) -> SentimentRecord {
        SentimentRecord {
            stock_code: "005930".to_string(),
            news_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            press: String::new(),
            headline: "호실적".to_string(),
            sentiment_score: score,
            sentiment_reason: String::new(),
            article_url: url.to_string(),
            published_at: Utc::now(),
            source: "ANALYZER".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_idempotent() {
        let store = MemorySentimentStore::new();

        store.save(&record("/a", 70)).await.unwrap();
        store.save(&record("/a", 10)).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.rows()["/a"].sentiment_score, 70);
        assert!(store.exists("/a").await.unwrap());
        assert!(!store.exists("/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_static_universe() {
        let universe = StaticUniverse::new(&[("005930", "삼성전자")]);
        let active = universe.active().await.unwrap();
        assert_eq!(active.len(), 1);

        let empty = StaticUniverse::empty().active().await.unwrap();
        assert!(empty.is_empty());
    }
}
