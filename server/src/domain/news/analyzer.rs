//! Phase 2: sentiment scoring consumer (`group_analyzer`)
//!
//! Pending-first drain, then budgeted reads of new entries. Every
//! consumed entry is acknowledged exactly once regardless of processing
//! outcome. The bus is the delivery engine, not the audit log, so a
//! poison entry never blocks the head of the line. Idempotence lives at
//! the store: URLs already persisted skip the LLM entirely.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;

use crate::core::config::PipelineConfig;
use crate::core::constants::{
    ANALYZER_CONSUMER, ANALYZER_GROUP, ANALYZER_READ_BATCH, NEWS_STREAM, READ_BLOCK_MS,
};
use crate::data::NewsBus;
use crate::data::bus::{BusError, StreamEntry};
use crate::data::store::{SentimentRecord, SentimentStore};
use crate::llm::SentimentLlm;

use super::{Article, SentimentResult};

/// Schema required from the sentiment LLM
fn sentiment_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "score": {"type": "integer", "minimum": 0, "maximum": 100},
            "reason": {"type": "string"},
        },
        "required": ["score", "reason"],
    })
}

/// News sentiment analyzer
pub struct NewsAnalyzer {
    bus: Arc<NewsBus>,
    llm: Arc<dyn SentimentLlm>,
    store: Arc<dyn SentimentStore>,
    emergency_keywords: Vec<String>,
    concurrency: usize,
}

impl NewsAnalyzer {
    pub fn new(
        bus: Arc<NewsBus>,
        llm: Arc<dyn SentimentLlm>,
        store: Arc<dyn SentimentStore>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            bus,
            llm,
            store,
            emergency_keywords: config.emergency_keywords.clone(),
            concurrency: config.analyzer_concurrency.max(1),
        }
    }

    /// Run one analysis pass
    ///
    /// Drains this consumer's pending entries first, then reads new
    /// entries until `max_messages` is spent or the stream goes idle.
    /// Returns the number of entries consumed.
    pub async fn run_once(&self, max_messages: usize) -> Result<usize, BusError> {
        self.bus.ensure_group(NEWS_STREAM, ANALYZER_GROUP).await?;

        let mut processed = self.drain_pending().await?;

        while processed < max_messages {
            let count = (max_messages - processed).min(ANALYZER_READ_BATCH);
            let entries = self
                .bus
                .read_new(NEWS_STREAM, ANALYZER_GROUP, ANALYZER_CONSUMER, count, READ_BLOCK_MS)
                .await?;
            if entries.is_empty() {
                break;
            }
            let (consumed, _) = self.process_batch(entries).await;
            processed += consumed;
        }

        Ok(processed)
    }

    /// Replay entries left unacked by a crashed run
    async fn drain_pending(&self) -> Result<usize, BusError> {
        let mut count = 0;
        loop {
            let entries = self
                .bus
                .read_pending(NEWS_STREAM, ANALYZER_GROUP, ANALYZER_CONSUMER, ANALYZER_READ_BATCH)
                .await?;
            if entries.is_empty() {
                break;
            }

            let (consumed, all_acked) = self.process_batch(entries).await;
            count += consumed;
            if !all_acked {
                // An unackable entry would replay forever; leave the
                // rest of pending for the next run.
                break;
            }
        }
        Ok(count)
    }

    /// Analyze a batch with bounded LLM concurrency
    ///
    /// Returns (entries consumed, whether every ack succeeded).
    async fn process_batch(&self, entries: Vec<StreamEntry>) -> (usize, bool) {
        let consumed = entries.len();
        let acks: Vec<bool> = futures::stream::iter(entries)
            .map(|entry| self.process_entry(entry))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        (consumed, acks.into_iter().all(|ok| ok))
    }

    /// Process one entry and ack it unconditionally
    async fn process_entry(&self, entry: StreamEntry) -> bool {
        self.analyze_entry(&entry).await;

        match self.bus.ack(NEWS_STREAM, ANALYZER_GROUP, &entry.id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(entry_id = %entry.id, error = %e, "Ack failed");
                false
            }
        }
    }

    async fn analyze_entry(&self, entry: &StreamEntry) {
        let article = Article::from_entry(entry);
        if article.headline.is_empty() || article.stock_code.is_empty() {
            tracing::debug!(entry_id = %entry.id, "Skipping malformed entry");
            return;
        }

        // Idempotence gate: an already-analyzed URL never reaches the LLM
        match self.store.exists(&article.article_url).await {
            Ok(true) => {
                tracing::debug!(article_url = %article.article_url, "Already analyzed, skipping");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Store existence check failed");
            }
        }

        if self.is_emergency(&article.headline) {
            // Surfaced flag reserved for fast-path routing; delivery
            // semantics are unchanged here.
            tracing::info!(
                stock_code = %article.stock_code,
                headline = %article.headline,
                "Emergency headline detected"
            );
        }

        let sentiment = self.score_headline(&article).await;

        let record = SentimentRecord {
            stock_code: article.stock_code.clone(),
            news_date: article.published_at.date_naive(),
            press: article.press.clone(),
            headline: article.headline.clone(),
            sentiment_score: sentiment.score,
            sentiment_reason: sentiment.reason,
            article_url: article.article_url.clone(),
            published_at: article.published_at,
            source: "ANALYZER".to_string(),
        };

        if let Err(e) = self.store.save(&record).await {
            // Accepted loss: the entry is still acked, duplicates on a
            // later crawl cost LLM spend only.
            tracing::warn!(stock_code = %article.stock_code, error = %e, "Save sentiment failed");
        }
    }

    fn is_emergency(&self, headline: &str) -> bool {
        self.emergency_keywords.iter().any(|kw| headline.contains(kw))
    }

    /// Ask the LLM for a score; provider failure yields the neutral default
    async fn score_headline(&self, article: &Article) -> SentimentResult {
        let prompt = format!(
            "다음 한국 주식 뉴스의 감성을 분석하세요.\n\
             종목코드: {}\n\
             헤드라인: {}\n\n\
             score(0-100, 50=중립)와 reason(한국어 1문장)을 JSON으로 반환.",
            article.stock_code, article.headline
        );

        match self.llm.generate_json(&prompt, &sentiment_schema()).await {
            Ok(value) => match value.get("score").and_then(|v| v.as_i64()) {
                Some(score) => SentimentResult {
                    score: score.clamp(0, 100) as i32,
                    reason: value
                        .get("reason")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                },
                None => {
                    tracing::debug!(
                        stock_code = %article.stock_code,
                        "Sentiment response missing score, using neutral default"
                    );
                    SentimentResult::neutral_fallback()
                }
            },
            Err(e) => {
                tracing::debug!(
                    stock_code = %article.stock_code,
                    error = %e,
                    "Sentiment LLM failed, using neutral default"
                );
                SentimentResult::neutral_fallback()
            }
        }
    }
}
