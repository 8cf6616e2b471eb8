//! Vector sink
//!
//! Embeds short news documents and upserts them into a vector store for
//! retrieval. The HTTP implementation talks to an OpenAI-compatible
//! embedding server and a Qdrant instance; the memory implementation
//! backs tests.
//!
//! `VectorSink::add` is **not idempotent** on the source URL: point ids
//! are random, so re-delivered entries can accumulate duplicate vectors
//! until the collaborator contract gains an upsert key. Surfaced here
//! rather than hidden behind a hash.

mod error;
mod http;
mod memory;

use async_trait::async_trait;
use serde::Serialize;

pub use error::VectorError;
pub use http::HttpVectorSink;
pub use memory::MemoryVectorSink;

/// Structured payload stored alongside each vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocMetadata {
    pub stock_code: String,
    pub source_url: String,
    pub source: String,
}

/// A short document headed for the vector store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: DocMetadata,
}

/// Embedding + vector-store write target
#[async_trait]
pub trait VectorSink: Send + Sync {
    /// Probe readiness without writing
    ///
    /// The archiver treats an unready sink as "process nothing": it
    /// returns before reading so the group cursor does not advance.
    async fn ensure_ready(&self) -> Result<(), VectorError>;

    /// Embed and upsert documents, returning the number written
    async fn add(&self, documents: &[Document]) -> Result<usize, VectorError>;
}

/// Overlapping character-window splitter
///
/// Mirrors the archiver's chunking of `[code] headline` documents:
/// windows of `chunk_size` chars advancing by `chunk_size - overlap`.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkSplitter {
    /// `overlap` must be smaller than `chunk_size` (validated at config
    /// load)
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = ChunkSplitter::new(500, 50);
        let chunks = splitter.split("[005930] 삼성전자 호실적");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let splitter = ChunkSplitter::new(500, 50);
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn test_long_text_overlaps() {
        let splitter = ChunkSplitter::new(10, 3);
        let text: String = ('a'..='z').collect();
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].chars().count(), 10);
        // Each successive chunk starts 7 chars later, repeating 3
        assert!(chunks[0].ends_with(&chunks[1][..3]));
        // Every character is covered
        let last = chunks.last().unwrap();
        assert!(last.ends_with('z'));
    }

    #[test]
    fn test_degenerate_overlap_clamped() {
        let splitter = ChunkSplitter::new(4, 10);
        let chunks = splitter.split("abcdefgh");
        assert!(chunks.len() >= 2);
    }
}
