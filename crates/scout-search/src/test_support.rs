//! Deterministic collaborator doubles for tests.
//!
//! Everything here is seedable and clock-free so pipeline tests compare
//! byte-identical outputs across runs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use scout_planner::{LlmClient, LlmError};
use scout_types::{FilterOperator, FilterPredicate};

use crate::SourceError;
use crate::embedding::Embedder;
use crate::structured::{StructuredHit, StructuredStore};
use crate::vector::{VectorHit, VectorSearch};

/// Replays scripted responses in order; repeats the last when drained.
pub struct StaticLlm {
    responses: Mutex<Vec<serde_json::Value>>,
}

impl StaticLlm {
    /// Script a response sequence.
    #[must_use]
    pub fn new(responses: Vec<serde_json::Value>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl LlmClient for StaticLlm {
    async fn invoke(&self, _system: &str, _user: &str) -> Result<serde_json::Value, LlmError> {
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| LlmError::Transport("poisoned script".to_string()))?;
        if responses.is_empty() {
            return Err(LlmError::Parse("script exhausted".to_string()));
        }
        if responses.len() == 1 {
            return Ok(responses[0].clone());
        }
        Ok(responses.remove(0))
    }
}

/// An LLM that always fails at the transport level.
pub struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    async fn invoke(&self, _system: &str, _user: &str) -> Result<serde_json::Value, LlmError> {
        Err(LlmError::Transport("connection refused".to_string()))
    }
}

/// Deterministic embedder: a small vector derived from the text bytes, plus
/// a seedable tool-embedding table.
pub struct HashEmbedder {
    dimension: usize,
    tools: HashMap<(String, String), Vec<f32>>,
    delay: Option<Duration>,
}

impl HashEmbedder {
    /// Build with the given vector dimension.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            tools: HashMap::new(),
            delay: None,
        }
    }

    /// Seed a stored tool embedding.
    #[must_use]
    pub fn with_tool(mut self, tool_id: &str, embedding_field: &str, vector: Vec<f32>) -> Self {
        self.tools
            .insert((tool_id.to_string(), embedding_field.to_string()), vector);
        self
    }

    /// Delay every call; used to exercise timeouts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The vector this embedder derives for a text.
    #[must_use]
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut seed = 0u32;
        for byte in text.trim().to_lowercase().bytes() {
            seed = seed.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        (0..self.dimension)
            .map(|i| {
                let v = seed.wrapping_add(i as u32).wrapping_mul(2_654_435_761) % 2000;
                (v as f32 / 1000.0) - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SourceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.vector_for(text))
    }

    async fn tool_embedding(
        &self,
        tool_id: &str,
        embedding_field: &str,
    ) -> Result<Option<Vec<f32>>, SourceError> {
        Ok(self
            .tools
            .get(&(tool_id.to_string(), embedding_field.to_string()))
            .cloned())
    }
}

/// In-memory vector store with per-collection documents and fault injection.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: HashMap<String, Vec<(String, Vec<f32>, serde_json::Value)>>,
    failing: Vec<String>,
    delay: Option<Duration>,
}

impl InMemoryVectorStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to a collection.
    #[must_use]
    pub fn with_document(
        mut self,
        collection: &str,
        id: &str,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Self {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push((id.to_string(), vector, payload));
        self
    }

    /// Make one collection fail every search.
    #[must_use]
    pub fn with_failing_collection(mut self, collection: &str) -> Self {
        self.failing.push(collection.to_string());
        self
    }

    /// Delay every search; used to exercise timeouts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

#[async_trait]
impl VectorSearch for InMemoryVectorStore {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: u32,
    ) -> Result<Vec<VectorHit>, SourceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.iter().any(|c| c == collection) {
            return Err(SourceError::new(format!("collection `{collection}` down")));
        }
        let Some(documents) = self.collections.get(collection) else {
            return Err(SourceError::new(format!("collection `{collection}` not found")));
        };
        let mut hits: Vec<VectorHit> = documents
            .iter()
            .map(|(id, doc_vector, payload)| VectorHit {
                id: id.clone(),
                score: cosine(vector, doc_vector),
                payload: payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(top_k as usize);
        Ok(hits)
    }
}

/// In-memory structured store evaluating the full predicate set.
#[derive(Default)]
pub struct InMemoryStructuredStore {
    documents: Vec<(String, serde_json::Value)>,
    failing: bool,
    delay: Option<Duration>,
}

impl InMemoryStructuredStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document.
    #[must_use]
    pub fn with_document(mut self, id: &str, payload: serde_json::Value) -> Self {
        self.documents.push((id.to_string(), payload));
        self
    }

    /// Make every query fail.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Delay every query; used to exercise timeouts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl StructuredStore for InMemoryStructuredStore {
    async fn query(
        &self,
        _collection: &str,
        filters: &[FilterPredicate],
        limit: u32,
    ) -> Result<Vec<StructuredHit>, SourceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(SourceError::new("structured store down"));
        }
        Ok(self
            .documents
            .iter()
            .filter(|(_, payload)| filters.iter().all(|f| matches_predicate(payload, f)))
            .take(limit as usize)
            .map(|(id, payload)| StructuredHit {
                id: id.clone(),
                payload: payload.clone(),
            })
            .collect())
    }
}

/// Resolve a dotted field path inside a payload.
fn resolve_path<'a>(payload: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = payload;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// Evaluate one predicate against a document payload.
#[must_use]
pub fn matches_predicate(payload: &serde_json::Value, filter: &FilterPredicate) -> bool {
    let Some(value) = resolve_path(payload, &filter.field) else {
        return false;
    };
    match filter.operator {
        FilterOperator::In => {
            let Some(allowed) = filter.value.as_array() else {
                return false;
            };
            match value {
                serde_json::Value::Array(entries) => {
                    entries.iter().any(|entry| allowed.contains(entry))
                }
                scalar => allowed.contains(scalar),
            }
        }
        FilterOperator::Eq => value == &filter.value,
        FilterOperator::Ne => value != &filter.value,
        FilterOperator::Lt => compare_numeric(value, &filter.value, |a, b| a < b),
        FilterOperator::Lte => compare_numeric(value, &filter.value, |a, b| a <= b),
        FilterOperator::Gt => compare_numeric(value, &filter.value, |a, b| a > b),
        FilterOperator::Gte => compare_numeric(value, &filter.value, |a, b| a >= b),
        FilterOperator::ElemMatch => {
            let Some(elements) = value.as_array() else {
                return false;
            };
            elements.iter().any(|element| elem_matches(element, &filter.value))
        }
    }
}

fn elem_matches(element: &serde_json::Value, conditions: &serde_json::Value) -> bool {
    let Some(conditions) = conditions.as_object() else {
        return false;
    };
    conditions.iter().all(|(key, condition)| {
        let Some(actual) = element.get(key) else {
            return false;
        };
        match condition {
            serde_json::Value::Object(ops) => ops.iter().all(|(op, operand)| match op.as_str() {
                "<" => compare_numeric(actual, operand, |a, b| a < b),
                "<=" => compare_numeric(actual, operand, |a, b| a <= b),
                ">" => compare_numeric(actual, operand, |a, b| a > b),
                ">=" => compare_numeric(actual, operand, |a, b| a >= b),
                "!=" => actual != operand,
                _ => false,
            }),
            scalar => actual == scalar,
        }
    })
}

fn compare_numeric(
    actual: &serde_json::Value,
    operand: &serde_json::Value,
    cmp: fn(f64, f64) -> bool,
) -> bool {
    match (actual.as_f64(), operand.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}
