//! Embedding client: HTTP `/embed/batch` plus stored tool-vector lookup.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::SourceError;

/// Seam for query embedding and reference-tool vector lookup.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SourceError>;

    /// Stored vector of a named tool for one embedding field; `None` when the
    /// tool is unknown.
    async fn tool_embedding(
        &self,
        tool_id: &str,
        embedding_field: &str,
    ) -> Result<Option<Vec<f32>>, SourceError>;
}

#[derive(Deserialize)]
struct EmbedBatchResponse {
    vectors: Option<Vec<Vec<f32>>>,
}

#[derive(Deserialize)]
struct ToolEmbeddingResponse {
    vector: Option<Vec<f32>>,
}

/// HTTP embedder against an embedding service.
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
}

impl HttpEmbedder {
    /// Build a client; `base_url` hosts `/embed/batch` and `/embeddings/tool`.
    #[must_use]
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SourceError> {
        let started = Instant::now();
        let url = format!("{}/embed/batch", self.base_url);
        let body = serde_json::json!({ "texts": [text] });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                tracing::debug!(
                    event = "search.embedding.request_failed",
                    url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "embedding request failed"
                );
                SourceError::new(error)
            })?;
        if !resp.status().is_success() {
            return Err(SourceError::new(format!(
                "embedding service returned {}",
                resp.status()
            )));
        }
        let data: EmbedBatchResponse = resp.json().await.map_err(SourceError::new)?;
        let vector = data
            .vectors
            .and_then(|mut v| if v.is_empty() { None } else { Some(v.remove(0)) })
            .ok_or_else(|| SourceError::new("embedding response carried no vectors"))?;
        tracing::debug!(
            event = "search.embedding.completed",
            elapsed_ms = started.elapsed().as_millis() as u64,
            dimension = vector.len(),
            "embedding completed"
        );
        Ok(vector)
    }

    async fn tool_embedding(
        &self,
        tool_id: &str,
        embedding_field: &str,
    ) -> Result<Option<Vec<f32>>, SourceError> {
        let url = format!("{}/embeddings/tool", self.base_url);
        let body = serde_json::json!({ "toolId": tool_id, "embeddingField": embedding_field });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(SourceError::new)?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(SourceError::new(format!(
                "tool embedding lookup returned {}",
                resp.status()
            )));
        }
        let data: ToolEmbeddingResponse = resp.json().await.map_err(SourceError::new)?;
        Ok(data.vector)
    }
}
