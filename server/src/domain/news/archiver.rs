//! Phase 3: vector archive consumer (`group_archiver`)
//!
//! Same consumer-group lifecycle as the analyzer with larger batches
//! and no LLM: compose a short `[code] headline` document, chunk it,
//! embed, and upsert. An unready sink (late-initialised embedder)
//! processes nothing and returns before any read, so the group cursor
//! only advances once writes are possible.

use std::sync::Arc;

use crate::core::config::VectorConfig;
use crate::core::constants::{
    ARCHIVER_BATCH_SIZE, ARCHIVER_CONSUMER, ARCHIVER_GROUP, NEWS_STREAM, READ_BLOCK_MS,
};
use crate::data::NewsBus;
use crate::data::bus::{BusError, StreamEntry};
use crate::data::vector::{ChunkSplitter, DocMetadata, Document, VectorSink};

use super::Article;

/// News vector archiver
pub struct NewsArchiver {
    bus: Arc<NewsBus>,
    sink: Arc<dyn VectorSink>,
    splitter: ChunkSplitter,
}

impl NewsArchiver {
    pub fn new(bus: Arc<NewsBus>, sink: Arc<dyn VectorSink>, config: &VectorConfig) -> Self {
        Self {
            bus,
            sink,
            splitter: ChunkSplitter::new(config.chunk_size, config.chunk_overlap),
        }
    }

    /// Run one archive pass; returns the number of entries consumed
    pub async fn run_once(&self, max_messages: usize) -> Result<usize, BusError> {
        self.bus.ensure_group(NEWS_STREAM, ARCHIVER_GROUP).await?;

        if let Err(e) = self.sink.ensure_ready().await {
            tracing::warn!(error = %e, "Vector sink not ready, skipping archive run");
            return Ok(0);
        }

        let mut processed = self.drain_pending().await?;

        while processed < max_messages {
            let count = (max_messages - processed).min(ARCHIVER_BATCH_SIZE);
            let entries = self
                .bus
                .read_new(NEWS_STREAM, ARCHIVER_GROUP, ARCHIVER_CONSUMER, count, READ_BLOCK_MS)
                .await?;
            if entries.is_empty() {
                break;
            }
            let (consumed, _) = self.process_batch(entries).await;
            processed += consumed;
        }

        Ok(processed)
    }

    async fn drain_pending(&self) -> Result<usize, BusError> {
        let mut count = 0;
        loop {
            let entries = self
                .bus
                .read_pending(NEWS_STREAM, ARCHIVER_GROUP, ARCHIVER_CONSUMER, ARCHIVER_BATCH_SIZE)
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

    /// Archive a batch in order, acking each entry
    ///
    /// Returns (entries consumed, whether every ack succeeded).
    async fn process_batch(&self, entries: Vec<StreamEntry>) -> (usize, bool) {
        let mut consumed = 0;
        for entry in entries {
            self.archive_entry(&entry).await;
            if let Err(e) = self.bus.ack(NEWS_STREAM, ARCHIVER_GROUP, &entry.id).await {
                tracing::warn!(entry_id = %entry.id, error = %e, "Ack failed");
                // Stop consuming; the caller must not re-read pending
                return (consumed, false);
            }
            consumed += 1;
        }
        (consumed, true)
    }

    async fn archive_entry(&self, entry: &StreamEntry) {
        let article = Article::from_entry(entry);
        if article.headline.is_empty() {
            return;
        }

        let content = format!("[{}] {}", article.stock_code, article.headline);
        let metadata = DocMetadata {
            stock_code: article.stock_code.clone(),
            source_url: article.article_url.clone(),
            source: if article.source.is_empty() {
                "NAVER".to_string()
            } else {
                article.source.clone()
            },
        };

        let documents: Vec<Document> = self
            .splitter
            .split(&content)
            .into_iter()
            .map(|chunk| Document {
                content: chunk,
                metadata: metadata.clone(),
            })
            .collect();

        if let Err(e) = self.sink.add(&documents).await {
            // Entry is still acked by the caller; the vector archive is
            // best-effort
            tracing::warn!(
                article_url = %article.article_url,
                error = %e,
                "Vector archive failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::data::vector::MemoryVectorSink;

    fn article(url: &str, headline: &str) -> Article {
        Article {
            stock_code: "005930".to_string(),
            stock_name: "삼성전자".to_string(),
            headline: headline.to_string(),
            press: "한경".to_string(),
            summary: String::new(),
            article_url: url.to_string(),
            published_at: Utc::now(),
            source: "NAVER".to_string(),
        }
    }

    async fn publish(bus: &NewsBus, articles: &[Article]) {
        let batch: Vec<_> = articles.iter().map(Article::to_fields).collect();
        bus.publish_batch(NEWS_STREAM, &batch).await.unwrap();
    }

    fn archiver(bus: &Arc<NewsBus>, sink: &Arc<MemoryVectorSink>) -> NewsArchiver {
        NewsArchiver::new(
            Arc::clone(bus),
            Arc::clone(sink) as Arc<dyn VectorSink>,
            &VectorConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_archives_with_metadata() {
        let bus = Arc::new(NewsBus::memory());
        let sink = Arc::new(MemoryVectorSink::new());
        publish(&bus, &[article("/a", "호실적")]).await;

        let archived = archiver(&bus, &sink).run_once(10).await.unwrap();
        assert_eq!(archived, 1);

        let docs = sink.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "[005930] 호실적");
        assert_eq!(docs[0].metadata.source_url, "/a");
        assert_eq!(docs[0].metadata.source, "NAVER");

        let stats = bus.stats(NEWS_STREAM, ARCHIVER_GROUP).await.unwrap();
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unready_sink_leaves_cursor_alone() {
        let bus = Arc::new(NewsBus::memory());
        let sink = Arc::new(MemoryVectorSink::unready());
        publish(&bus, &[article("/a", "호실적")]).await;

        let archiver = archiver(&bus, &sink);
        let archived = archiver.run_once(10).await.unwrap();
        assert_eq!(archived, 0);
        assert!(sink.is_empty());

        // Once the embedder comes up the same entry is still delivered
        sink.set_ready(true);
        let archived = archiver.run_once(10).await.unwrap();
        assert_eq!(archived, 1);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_still_acks() {
        let bus = Arc::new(NewsBus::memory());
        let sink = Arc::new(MemoryVectorSink::new());
        publish(&bus, &[article("/a", "호실적")]).await;

        let archiver = archiver(&bus, &sink);
        // Readiness passes, but every write fails
        sink.set_fail_writes(true);
        let archived = archiver.run_once(10).await.unwrap();
        assert_eq!(archived, 1);
        assert!(sink.is_empty());

        let stats = bus.stats(NEWS_STREAM, ARCHIVER_GROUP).await.unwrap();
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_from_analyzer_group() {
        use crate::core::constants::ANALYZER_GROUP;

        let bus = Arc::new(NewsBus::memory());
        let sink = Arc::new(MemoryVectorSink::new());
        publish(&bus, &[article("/a", "호실적")]).await;

        // Analyzer group consumes the entry first
        bus.ensure_group(NEWS_STREAM, ANALYZER_GROUP).await.unwrap();
        let taken = bus
            .read_new(NEWS_STREAM, ANALYZER_GROUP, "analyzer_1", 10, 0)
            .await
            .unwrap();
        assert_eq!(taken.len(), 1);

        // The archiver group still receives it
        let archived = archiver(&bus, &sink).run_once(10).await.unwrap();
        assert_eq!(archived, 1);
    }
}
