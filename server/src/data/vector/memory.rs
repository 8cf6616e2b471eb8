//! In-memory vector sink double for tests

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::VectorError;
use super::{Document, VectorSink};

/// Records added documents; readiness is switchable to exercise the
/// archiver's late-initialisation path.
pub struct MemoryVectorSink {
    ready: AtomicBool,
    fail_writes: AtomicBool,
    docs: RwLock<Vec<Document>>,
}

impl Default for MemoryVectorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVectorSink {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Start unready (embedder not yet available)
    pub fn unready() -> Self {
        Self {
            ready: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            docs: RwLock::new(Vec::new()),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    /// Make subsequent `add` calls fail while readiness still passes
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Snapshot of everything added so far
    pub fn documents(&self) -> Vec<Document> {
        self.docs.read().clone()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

#[async_trait]
impl VectorSink for MemoryVectorSink {
    async fn ensure_ready(&self) -> Result<(), VectorError> {
        if self.ready.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(VectorError::NotReady("embedder unavailable".into()))
        }
    }

    async fn add(&self, documents: &[Document]) -> Result<usize, VectorError> {
        self.ensure_ready().await?;
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(VectorError::Response("upsert failed: 500".into()));
        }
        self.docs.write().extend_from_slice(documents);
        Ok(documents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vector::DocMetadata;

    fn doc(url: &str) -> Document {
        Document {
            content: "[005930] 호실적".to_string(),
            metadata: DocMetadata {
                stock_code: "005930".to_string(),
                source_url: url.to_string(),
                source: "NAVER".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_add_records_documents() {
        let sink = MemoryVectorSink::new();
        sink.add(&[doc("/a"), doc("/b")]).await.unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_unready_sink_rejects() {
        let sink = MemoryVectorSink::unready();
        assert!(sink.ensure_ready().await.is_err());
        assert!(sink.add(&[doc("/a")]).await.is_err());
        assert!(sink.is_empty());

        sink.set_ready(true);
        assert!(sink.ensure_ready().await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicates_accumulate() {
        // add() is not idempotent on source_url by contract
        let sink = MemoryVectorSink::new();
        sink.add(&[doc("/a")]).await.unwrap();
        sink.add(&[doc("/a")]).await.unwrap();
        assert_eq!(sink.len(), 2);
    }
}
