//! SQLite implementation of the relational store

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use super::error::StoreError;
use super::{SentimentRecord, SentimentStore, UniverseSource};
use crate::core::constants::{MAX_HEADLINE_LEN, MAX_REASON_LEN, MAX_URL_LEN};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS stocks (
    stock_code TEXT PRIMARY KEY,
    stock_name TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS news_sentiments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stock_code TEXT NOT NULL,
    news_date TEXT NOT NULL,
    press TEXT NOT NULL DEFAULT '',
    headline TEXT NOT NULL,
    sentiment_score INTEGER NOT NULL,
    sentiment_reason TEXT,
    article_url TEXT NOT NULL UNIQUE,
    published_at TEXT NOT NULL,
    source TEXT NOT NULL DEFAULT 'ANALYZER',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_news_sentiments_stock_date
    ON news_sentiments (stock_code, news_date);
"#;

/// SQLite-backed sentiment store and universe source
pub struct SqliteNewsStore {
    pool: SqlitePool,
}

impl SqliteNewsStore {
    /// Open (creating if missing) the database at `path` and apply the schema
    pub async fn init(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        tracing::debug!(path = %path.display(), "SQLite store opened");
        Ok(Self { pool })
    }

    /// Seed or update a universe row (admin/bootstrap surface)
    pub async fn upsert_stock(
        &self,
        stock_code: &str,
        stock_name: &str,
        is_active: bool,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO stocks (stock_code, stock_name, is_active)
            VALUES (?, ?, ?)
            ON CONFLICT (stock_code) DO UPDATE
                SET stock_name = excluded.stock_name,
                    is_active = excluded.is_active
            "#,
        )
        .bind(stock_code)
        .bind(stock_name)
        .bind(is_active as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SentimentStore for SqliteNewsStore {
    async fn exists(&self, article_url: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM news_sentiments WHERE article_url = ? LIMIT 1")
            .bind(truncate_chars(article_url, MAX_URL_LEN).into_owned())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    async fn save(&self, record: &SentimentRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO news_sentiments
                (stock_code, news_date, press, headline, sentiment_score,
                 sentiment_reason, article_url, published_at, source)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (article_url) DO NOTHING
            "#,
        )
        .bind(&record.stock_code)
        .bind(record.news_date)
        .bind(&record.press)
        .bind(truncate_chars(&record.headline, MAX_HEADLINE_LEN).into_owned())
        .bind(record.sentiment_score)
        .bind(truncate_chars(&record.sentiment_reason, MAX_REASON_LEN).into_owned())
        .bind(truncate_chars(&record.article_url, MAX_URL_LEN).into_owned())
        .bind(record.published_at)
        .bind(&record.source)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UniverseSource for SqliteNewsStore {
    async fn active(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let rows = sqlx::query("SELECT stock_code, stock_name FROM stocks WHERE is_active = 1")
            .fetch_all(&self.pool)
            .await?;

        let mut universe = BTreeMap::new();
        for row in rows {
            let code: String = row.try_get("stock_code")?;
            let name: String = row.try_get("stock_name")?;
            universe.insert(code, name);
        }

        Ok(universe)
    }
}

/// Bound a string to `max` characters without splitting a code point
fn truncate_chars(s: &str, max: usize) -> std::borrow::Cow<'_, str> {
    match s.char_indices().nth(max) {
        Some((idx, _)) => std::borrow::Cow::Borrowed(&s[..idx]),
        None => std::borrow::Cow::Borrowed(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    async fn open_store() -> (SqliteNewsStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteNewsStore::init(&dir.path().join("test.db"))
            .await
            .unwrap();
        (store, dir)
    }

    fn record(url: &str, score: i32) -> SentimentRecord {
        SentimentRecord {
            stock_code: "005930".to_string(),
            news_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            press: "한경".to_string(),
            headline: "호실적".to_string(),
            sentiment_score: score,
            sentiment_reason: "실적 개선 기대".to_string(),
            article_url: url.to_string(),
            published_at: Utc::now(),
            source: "ANALYZER".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_then_exists() {
        let (store, _dir) = open_store().await;

        assert!(!store.exists("https://example.com/a").await.unwrap());
        store.save(&record("https://example.com/a", 70)).await.unwrap();
        assert!(store.exists("https://example.com/a").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_is_idempotent_on_url() {
        let (store, _dir) = open_store().await;

        store.save(&record("https://example.com/a", 70)).await.unwrap();
        // Second save with a different score must not error or overwrite
        store.save(&record("https://example.com/a", 10)).await.unwrap();

        let row =
            sqlx::query("SELECT sentiment_score FROM news_sentiments WHERE article_url = ?")
                .bind("https://example.com/a")
                .fetch_one(&store.pool)
                .await
                .unwrap();
        let score: i32 = row.try_get("sentiment_score").unwrap();
        assert_eq!(score, 70);
    }

    #[tokio::test]
    async fn test_save_bounds_field_lengths() {
        let (store, _dir) = open_store().await;

        let mut rec = record("https://example.com/long", 50);
        rec.headline = "가".repeat(600);
        rec.sentiment_reason = "나".repeat(2500);
        store.save(&rec).await.unwrap();

        let row = sqlx::query(
            "SELECT headline, sentiment_reason FROM news_sentiments WHERE article_url = ?",
        )
        .bind("https://example.com/long")
        .fetch_one(&store.pool)
        .await
        .unwrap();
        let headline: String = row.try_get("headline").unwrap();
        let reason: String = row.try_get("sentiment_reason").unwrap();
        assert_eq!(headline.chars().count(), 500);
        assert_eq!(reason.chars().count(), 2000);
    }

    #[tokio::test]
    async fn test_universe_active_only() {
        let (store, _dir) = open_store().await;

        store.upsert_stock("005930", "삼성전자", true).await.unwrap();
        store.upsert_stock("000660", "SK하이닉스", true).await.unwrap();
        store.upsert_stock("123456", "상장폐지", false).await.unwrap();

        let universe = store.active().await.unwrap();
        assert_eq!(universe.len(), 2);
        assert_eq!(universe.get("005930").map(String::as_str), Some("삼성전자"));
        assert!(!universe.contains_key("123456"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("가나다", 2).as_ref(), "가나");
        assert_eq!(truncate_chars("abc", 5).as_ref(), "abc");
    }
}
