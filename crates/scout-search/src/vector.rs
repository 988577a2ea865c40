//! Vector store client: nearest-neighbour search per collection.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::SourceError;

/// One raw hit from a vector collection.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorHit {
    /// Document identifier.
    pub id: String,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
    /// Stored payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Seam for the vector store; collections are declared in the schema.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Ranked nearest-neighbour search on one collection.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: u32,
    ) -> Result<Vec<VectorHit>, SourceError>;
}

#[derive(Deserialize)]
struct SearchResponseBody {
    #[serde(default)]
    result: Vec<VectorHit>,
}

/// HTTP client against a points-search vector store API.
pub struct HttpVectorStore {
    client: Client,
    base_url: String,
}

impl HttpVectorStore {
    /// Build a client; `base_url` hosts `/collections/{name}/points/search`.
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
impl VectorSearch for HttpVectorStore {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: u32,
    ) -> Result<Vec<VectorHit>, SourceError> {
        let started = Instant::now();
        let url = format!("{}/collections/{collection}/points/search", self.base_url);
        let body = serde_json::json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                tracing::debug!(
                    event = "search.vector.request_failed",
                    collection,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "vector search request failed"
                );
                SourceError::new(error)
            })?;
        if !resp.status().is_success() {
            return Err(SourceError::new(format!(
                "vector store returned {} for `{collection}`",
                resp.status()
            )));
        }
        let data: SearchResponseBody = resp.json().await.map_err(SourceError::new)?;
        tracing::debug!(
            event = "search.vector.completed",
            collection,
            elapsed_ms = started.elapsed().as_millis() as u64,
            hits = data.result.len(),
            "vector search completed"
        );
        Ok(data.result)
    }
}
