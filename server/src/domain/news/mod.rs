//! News pipeline domain
//!
//! The unit of work is an [`Article`]: produced only by the collector,
//! mutated by no one, consumed independently by the analyzer and the
//! archiver. `article_url` uniquely identifies an article across all
//! sources and is the downstream idempotency key.

pub mod analyzer;
pub mod archiver;
pub mod collector;
pub mod pipeline;
pub mod status;

pub use analyzer::NewsAnalyzer;
pub use archiver::NewsArchiver;
pub use collector::NewsCollector;
pub use pipeline::{CollectOutcome, NewsPipeline, PipelineBusy};
pub use status::{PipelineStatus, StatusSnapshot};

use chrono::{DateTime, Utc};

use crate::data::bus::{EntryFields, StreamEntry};

/// One news article moving through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// 6-digit ticker code
    pub stock_code: String,
    pub stock_name: String,
    pub headline: String,
    pub press: String,
    pub summary: String,
    /// Absolute URL; unique across all sources
    pub article_url: String,
    /// Crawler assigns UTC
    pub published_at: DateTime<Utc>,
    /// Short origin tag, e.g. `NAVER`
    pub source: String,
}

impl Article {
    /// Encode for the bus; all values are strings on the wire
    pub fn to_fields(&self) -> EntryFields {
        vec![
            ("stock_code".to_string(), self.stock_code.clone()),
            ("stock_name".to_string(), self.stock_name.clone()),
            ("headline".to_string(), self.headline.clone()),
            ("press".to_string(), self.press.clone()),
            ("summary".to_string(), self.summary.clone()),
            ("article_url".to_string(), self.article_url.clone()),
            ("published_at".to_string(), self.published_at.to_rfc3339()),
            ("source".to_string(), self.source.clone()),
        ]
    }

    /// Decode from a bus entry
    ///
    /// Field values may be text or bytes depending on the substrate;
    /// both are canonicalised to text here. Missing fields decode to
    /// empty strings and an unparseable timestamp falls back to now;
    /// consumers validate what they need.
    pub fn from_entry(entry: &StreamEntry) -> Self {
        let published_at = DateTime::parse_from_rfc3339(&entry.field_text("published_at"))
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Self {
            stock_code: entry.field_text("stock_code"),
            stock_name: entry.field_text("stock_name"),
            headline: entry.field_text("headline"),
            press: entry.field_text("press"),
            summary: entry.field_text("summary"),
            article_url: entry.field_text("article_url"),
            published_at,
            source: entry.field_text("source"),
        }
    }
}

/// Sentiment outcome for one headline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentResult {
    /// 0..=100, 50 is neutral
    pub score: i32,
    pub reason: String,
}

impl SentimentResult {
    /// Neutral substitute used when the provider fails
    pub fn neutral_fallback() -> Self {
        Self {
            score: 50,
            reason: "분석 불가 — 기본 중립".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bus::FieldValue;
    use std::collections::HashMap;

    fn sample_article() -> Article {
        Article {
            stock_code: "005930".to_string(),
            stock_name: "삼성전자".to_string(),
            headline: "호실적".to_string(),
            press: "한경".to_string(),
            summary: String::new(),
            article_url: "https://finance.naver.com/a".to_string(),
            published_at: DateTime::parse_from_rfc3339("2025-03-01T09:30:00+09:00")
                .unwrap()
                .with_timezone(&Utc),
            source: "NAVER".to_string(),
        }
    }

    #[test]
    fn test_fields_round_trip() {
        let article = sample_article();
        let entry = StreamEntry {
            id: "1".to_string(),
            fields: article
                .to_fields()
                .into_iter()
                .map(|(k, v)| (k, FieldValue::Text(v)))
                .collect(),
        };

        assert_eq!(Article::from_entry(&entry), article);
    }

    #[test]
    fn test_decode_tolerates_byte_fields() {
        let mut fields = HashMap::new();
        fields.insert(
            "stock_code".to_string(),
            FieldValue::Bytes(b"005930".to_vec()),
        );
        fields.insert(
            "headline".to_string(),
            FieldValue::Bytes("호실적".as_bytes().to_vec()),
        );
        let entry = StreamEntry {
            id: "1".to_string(),
            fields,
        };

        let article = Article::from_entry(&entry);
        assert_eq!(article.stock_code, "005930");
        assert_eq!(article.headline, "호실적");
        assert_eq!(article.press, "");
    }

    #[test]
    fn test_decode_bad_timestamp_falls_back() {
        let mut fields = HashMap::new();
        fields.insert(
            "published_at".to_string(),
            FieldValue::Text("not-a-date".to_string()),
        );
        let entry = StreamEntry {
            id: "1".to_string(),
            fields,
        };

        let before = Utc::now();
        let article = Article::from_entry(&entry);
        assert!(article.published_at >= before);
    }

    #[test]
    fn test_neutral_fallback() {
        let fallback = SentimentResult::neutral_fallback();
        assert_eq!(fallback.score, 50);
        assert!(fallback.reason.contains("중립"));
    }
}
