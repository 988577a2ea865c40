//! scout-search - Retrieval execution for the Tool Scout pipeline
//!
//! Fans a validated query plan out across vector collections and the
//! structured store, normalizes and fuses the results, and exposes the
//! one-call `search` facade. Collaborators (embedder, vector store,
//! structured store) sit behind traits with thin HTTP implementations;
//! deterministic in-memory doubles live in [`test_support`].

pub use cache::{CacheStatsSnapshot, ResultCache};
pub use config::{ConfigError, PipelineConfig};
pub use embedding::{Embedder, HttpEmbedder};
pub use executor::{ExecutionOutcome, Executor, ExecutorConfig};
pub use fusion::{
    RRF_K, SourceList, dedupe, fuse, normalize_cosine, sort_and_truncate,
};
pub use pipeline::{SearchOptions, SearchPipeline, validate_search_request};
pub use settings::{
    CacheSettings, EmbeddingSettings, ExecutorSettings, LlmSettings, RuntimeSettings,
    StoreSettings, load_runtime_settings, load_runtime_settings_from_paths,
};
pub use structured::{HttpStructuredStore, StructuredHit, StructuredStore, predicates_to_document};
pub use vector::{HttpVectorStore, VectorHit, VectorSearch};

pub mod cache;
pub mod config;
pub mod embedding;
pub mod executor;
pub mod fusion;
pub mod pipeline;
pub mod settings;
pub mod structured;
#[doc(hidden)]
pub mod test_support;
pub mod vector;

use thiserror::Error;

/// Transport-level failure of one collaborator call.
///
/// Always recovered locally by the executor; the message lands in an error
/// entry, never in a panic or a terminal pipeline error.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SourceError(pub String);

impl SourceError {
    /// Build from anything displayable.
    #[must_use]
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}
