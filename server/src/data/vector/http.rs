//! HTTP vector sink: OpenAI-compatible embeddings + Qdrant REST upsert

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::error::VectorError;
use super::{Document, VectorSink};
use crate::core::config::VectorConfig;
use crate::core::constants::EMBED_TIMEOUT_SECS;

/// HTTP-backed vector sink
///
/// Readiness is probed lazily and cached: the embedding server must list
/// models and the vector store must answer before the first write. The
/// collection is created on first upsert once the embedding width is
/// known.
pub struct HttpVectorSink {
    client: reqwest::Client,
    config: VectorConfig,
    ready: AtomicBool,
}

impl HttpVectorSink {
    pub fn new(config: VectorConfig) -> Result<Self, VectorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EMBED_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            config,
            ready: AtomicBool::new(false),
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VectorError> {
        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }
        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.embed_url))
            .json(&json!({
                "model": self.config.embed_model,
                "input": texts,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: EmbeddingResponse = response.json().await?;
        if body.data.len() != texts.len() {
            return Err(VectorError::Response(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn upsert_points(&self, points: &serde_json::Value) -> Result<reqwest::StatusCode, VectorError> {
        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.config.qdrant_url, self.config.collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        Ok(response.status())
    }

    async fn create_collection(&self, dim: usize) -> Result<(), VectorError> {
        self.client
            .put(format!(
                "{}/collections/{}",
                self.config.qdrant_url, self.config.collection
            ))
            .json(&json!({
                "vectors": { "size": dim, "distance": "Cosine" }
            }))
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(
            collection = %self.config.collection,
            dim,
            "Vector collection created"
        );
        Ok(())
    }
}

#[async_trait]
impl VectorSink for HttpVectorSink {
    async fn ensure_ready(&self) -> Result<(), VectorError> {
        if self.ready.load(Ordering::Relaxed) {
            return Ok(());
        }

        self.client
            .get(format!("{}/models", self.config.embed_url))
            .send()
            .await
            .map_err(|e| VectorError::NotReady(format!("embedding server: {e}")))?
            .error_for_status()
            .map_err(|e| VectorError::NotReady(format!("embedding server: {e}")))?;

        self.client
            .get(format!("{}/collections", self.config.qdrant_url))
            .send()
            .await
            .map_err(|e| VectorError::NotReady(format!("vector store: {e}")))?
            .error_for_status()
            .map_err(|e| VectorError::NotReady(format!("vector store: {e}")))?;

        self.ready.store(true, Ordering::Relaxed);
        tracing::debug!(collection = %self.config.collection, "Vector sink ready");
        Ok(())
    }

    async fn add(&self, documents: &[Document]) -> Result<usize, VectorError> {
        if documents.is_empty() {
            return Ok(0);
        }
        self.ensure_ready().await?;

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embed(&texts).await?;
        let dim = vectors.first().map(|v| v.len()).unwrap_or(0);

        // Random point ids: re-delivered entries accumulate duplicates
        // until the sink contract gains an upsert key.
        let points: Vec<serde_json::Value> = documents
            .iter()
            .zip(vectors.iter())
            .map(|(doc, vector)| {
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "vector": vector,
                    "payload": {
                        "page_content": &doc.content,
                        "metadata": &doc.metadata,
                    },
                })
            })
            .collect();

        let points = serde_json::Value::Array(points);
        let status = self.upsert_points(&points).await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            // Collection missing: create with the observed width, retry once
            self.create_collection(dim).await?;
            let retry = self.upsert_points(&points).await?;
            if !retry.is_success() {
                return Err(VectorError::Response(format!(
                    "upsert failed after collection create: {retry}"
                )));
            }
        } else if !status.is_success() {
            return Err(VectorError::Response(format!("upsert failed: {status}")));
        }

        Ok(documents.len())
    }
}
