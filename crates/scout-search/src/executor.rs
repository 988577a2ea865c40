//! Executor: fans a validated plan out across sources and fuses the results.
//!
//! Per-source failures and timeouts are recovered locally; the source
//! contributes nothing and the request continues. Only an all-sources
//! failure is terminal. Result order is owned by the fusion algorithm,
//! never by completion order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::OnceCell;

use scout_types::{
    Candidate, CandidateSource, ErrorEntry, ErrorKind, FusionMethod, IntentRecord, PipelineError,
    PipelineResult, Provenance, QueryPlan, QueryVectorSource, SourceStats, StructuredSource,
    VectorSource,
};

use crate::SourceError;
use crate::embedding::Embedder;
use crate::fusion::{self, SourceList};
use crate::structured::StructuredStore;
use crate::vector::VectorSearch;

/// Knobs of the fan-out phase.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Soft deadline per vector source.
    pub vector_timeout: Duration,
    /// Soft deadline for the structured source.
    pub structured_timeout: Duration,
    /// Fixed score assigned to structured results.
    pub structured_score: f64,
    /// Weight of a source the planner left unweighted.
    pub default_weight: f64,
    /// Normalized vector hits below this score are dropped before fusion.
    pub score_threshold: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            vector_timeout: Duration::from_secs(5),
            structured_timeout: Duration::from_secs(3),
            structured_score: 0.5,
            default_weight: 0.5,
            score_threshold: 0.5,
        }
    }
}

/// What one plan execution produced.
#[derive(Debug)]
pub struct ExecutionOutcome {
    /// Ranked, deduplicated, truncated candidates.
    pub candidates: Vec<Candidate>,
    /// Per-source latency and counts.
    pub source_stats: Vec<SourceStats>,
    /// Recovered faults and non-fatal findings.
    pub errors: Vec<ErrorEntry>,
    /// Fusion method actually applied.
    pub fusion_applied: FusionMethod,
}

/// Fan-out executor over the collaborator seams.
pub struct Executor {
    embedder: Arc<dyn Embedder>,
    vector: Arc<dyn VectorSearch>,
    structured: Arc<dyn StructuredStore>,
    config: ExecutorConfig,
}

enum SourceOutput {
    Vector(Vec<Candidate>),
    Structured(Vec<Candidate>),
}

struct SourceRun {
    label: String,
    weight: f64,
    latency_ms: u64,
    result: Result<SourceOutput, ErrorEntry>,
}

impl Executor {
    /// Wire an executor to its collaborators.
    #[must_use]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorSearch>,
        structured: Arc<dyn StructuredStore>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            embedder,
            vector,
            structured,
            config,
        }
    }

    /// Rebuild with different budgets, keeping the wired collaborators.
    #[must_use]
    pub fn with_config(self, config: ExecutorConfig) -> Self {
        Self { config, ..self }
    }

    /// Execute a plan for one query.
    ///
    /// `deadline` bounds the whole fan-out; sources whose soft deadline
    /// exceeds the remaining budget are cut to it, so partial results are
    /// returned instead of nothing when the overall deadline hits.
    ///
    /// # Errors
    ///
    /// [`PipelineError::SourceUnavailable`] when every source of a non-empty
    /// plan failed.
    pub async fn execute(
        &self,
        plan: &QueryPlan,
        query: &str,
        intent: &IntentRecord,
        deadline: Option<Duration>,
    ) -> PipelineResult<ExecutionOutcome> {
        let started = Instant::now();
        let mut errors: Vec<ErrorEntry> = Vec::new();

        let total_sources = plan.vector_sources.len() + plan.structured_sources.len();
        if total_sources == 0 {
            return Ok(ExecutionOutcome {
                candidates: Vec::new(),
                source_stats: Vec::new(),
                errors: vec![ErrorEntry::recovered(
                    "executor",
                    ErrorKind::EmptyResult,
                    "plan declared no sources",
                )],
                fusion_applied: plan.fusion,
            });
        }

        // Request-scoped caches: the query embedding is computed at most
        // once, reference-tool vectors at most once per embedding field.
        let query_embedding: OnceCell<Result<Vec<f32>, SourceError>> = OnceCell::new();
        let tool_embeddings: DashMap<String, Option<Vec<f32>>> = DashMap::new();

        let deadline_cut = |soft: Duration| match deadline {
            Some(total) => soft.min(total.saturating_sub(started.elapsed())),
            None => soft,
        };

        let vector_runs = plan.vector_sources.iter().map(|source| {
            let budget = deadline_cut(self.config.vector_timeout);
            self.run_vector_source(source, query, intent, budget, &query_embedding, &tool_embeddings)
        });
        let structured_runs = plan
            .structured_sources
            .iter()
            .map(|source| self.run_structured_source(source, deadline_cut(self.config.structured_timeout)));

        // Vector searches and the structured query all run concurrently.
        let (vector_results, structured_results) =
            tokio::join!(join_all(vector_runs), join_all(structured_runs));
        let runs: Vec<SourceRun> = vector_results
            .into_iter()
            .chain(structured_results)
            .collect();

        let mut lists: Vec<SourceList> = Vec::new();
        let mut source_stats = Vec::new();
        let mut failed = 0usize;
        for run in runs {
            let (count, candidates) = match run.result {
                Ok(SourceOutput::Vector(candidates) | SourceOutput::Structured(candidates)) => {
                    (candidates.len(), Some(candidates))
                }
                Err(entry) => {
                    errors.push(entry);
                    failed += 1;
                    (0, None)
                }
            };
            source_stats.push(SourceStats {
                source: run.label.clone(),
                latency_ms: run.latency_ms,
                result_count: count,
                failed: candidates.is_none(),
            });
            if let Some(candidates) = candidates {
                lists.push(SourceList {
                    label: run.label,
                    weight: run.weight,
                    candidates,
                });
            }
        }

        let deadline_hit = deadline.is_some_and(|total| started.elapsed() >= total);
        if failed == total_sources && !deadline_hit {
            return Err(PipelineError::SourceUnavailable {
                source_label: "executor".to_string(),
                message: format!("all {total_sources} sources failed"),
            });
        }
        if deadline_hit {
            errors.push(ErrorEntry::recovered(
                "executor",
                ErrorKind::DeadlineExceeded,
                "overall deadline hit; returning best-effort partial results",
            ));
        }

        let fused = fusion::fuse(plan.fusion, &lists);
        let deduped = fusion::dedupe(fused);
        let candidates =
            fusion::sort_and_truncate(deduped, plan.total_budget() as usize);

        if candidates.is_empty() {
            errors.push(ErrorEntry::recovered(
                "executor",
                ErrorKind::EmptyResult,
                "no source produced candidates for this plan",
            ));
        }

        tracing::debug!(
            event = "search.executor.completed",
            elapsed_ms = started.elapsed().as_millis() as u64,
            sources = total_sources,
            failed,
            candidates = candidates.len(),
            fusion = ?plan.fusion,
            "plan execution completed"
        );
        Ok(ExecutionOutcome {
            candidates,
            source_stats,
            errors,
            fusion_applied: plan.fusion,
        })
    }

    async fn run_vector_source(
        &self,
        source: &VectorSource,
        query: &str,
        intent: &IntentRecord,
        budget: Duration,
        query_embedding: &OnceCell<Result<Vec<f32>, SourceError>>,
        tool_embeddings: &DashMap<String, Option<Vec<f32>>>,
    ) -> SourceRun {
        let label = format!("vector:{}", source.collection);
        let weight = source.weight.unwrap_or(self.config.default_weight);
        let started = Instant::now();
        let work = async {
            let vector = self
                .resolve_query_vector(source, query, intent, query_embedding, tool_embeddings)
                .await?;
            let hits = self
                .vector
                .search(&source.collection, &vector, source.top_k)
                .await?;
            let candidates = hits
                .into_iter()
                .map(|hit| Candidate {
                    id: hit.id,
                    source: CandidateSource::Vector,
                    score: fusion::normalize_cosine(f64::from(hit.score)),
                    metadata: hit.payload,
                    provenance: Provenance {
                        collections: vec![source.collection.clone()],
                        query_vector_sources: vec![source.query_vector_source],
                        filters_applied: Vec::new(),
                    },
                })
                .filter(|c| c.score >= self.config.score_threshold)
                .collect();
            Ok::<Vec<Candidate>, SourceError>(candidates)
        };
        let result = match tokio::time::timeout(budget, work).await {
            Ok(Ok(candidates)) => Ok(SourceOutput::Vector(candidates)),
            Ok(Err(error)) => {
                tracing::warn!(
                    event = "search.executor.vector_failed",
                    collection = %source.collection,
                    error = %error,
                    "vector source failed; continuing without it"
                );
                Err(PipelineError::SourceUnavailable {
                    source_label: label.clone(),
                    message: error.to_string(),
                }
                .entry("executor"))
            }
            Err(_) => {
                tracing::warn!(
                    event = "search.executor.vector_timeout",
                    collection = %source.collection,
                    budget_ms = budget.as_millis() as u64,
                    "vector source timed out; continuing without it"
                );
                Err(PipelineError::SourceTimeout {
                    source_label: label.clone(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
                .entry("executor"))
            }
        };
        SourceRun {
            label,
            weight,
            latency_ms: started.elapsed().as_millis() as u64,
            result,
        }
    }

    async fn resolve_query_vector(
        &self,
        source: &VectorSource,
        query: &str,
        intent: &IntentRecord,
        query_embedding: &OnceCell<Result<Vec<f32>, SourceError>>,
        tool_embeddings: &DashMap<String, Option<Vec<f32>>>,
    ) -> Result<Vec<f32>, SourceError> {
        match source.query_vector_source {
            QueryVectorSource::QueryText => self.embed_query(query, query_embedding).await,
            QueryVectorSource::SemanticVariant => {
                // Deterministic choice: the first variant; fall back to the
                // query text when none exist.
                match intent.semantic_variants.first() {
                    Some(variant) => self.embedder.embed(variant).await,
                    None => self.embed_query(query, query_embedding).await,
                }
            }
            QueryVectorSource::ReferenceToolEmbedding => {
                let Some(tool) = intent.reference_tool.as_deref() else {
                    return Err(SourceError::new(
                        "plan requested reference tool embedding but the intent names no tool",
                    ));
                };
                let key = format!("{tool}\u{1}{}", source.embedding_field);
                if let Some(cached) = tool_embeddings.get(&key) {
                    return cached
                        .value()
                        .clone()
                        .ok_or_else(|| SourceError::new(format!("no stored embedding for `{tool}`")));
                }
                let looked_up = self
                    .embedder
                    .tool_embedding(tool, &source.embedding_field)
                    .await?;
                tool_embeddings.insert(key, looked_up.clone());
                looked_up.ok_or_else(|| SourceError::new(format!("no stored embedding for `{tool}`")))
            }
        }
    }

    async fn embed_query(
        &self,
        query: &str,
        query_embedding: &OnceCell<Result<Vec<f32>, SourceError>>,
    ) -> Result<Vec<f32>, SourceError> {
        query_embedding
            .get_or_init(|| self.embedder.embed(query))
            .await
            .clone()
    }

    async fn run_structured_source(&self, source: &StructuredSource, budget: Duration) -> SourceRun {
        let label = format!("structured:{}", source.source);
        let weight = source.weight.unwrap_or(self.config.default_weight);
        let started = Instant::now();
        let rendered: Vec<String> = source
            .filters
            .iter()
            .map(|f| format!("{} {} {}", f.field, f.operator.as_str(), f.value))
            .collect();
        let work = self.structured.query(&source.source, &source.filters, source.limit);
        let result = match tokio::time::timeout(budget, work).await {
            Ok(Ok(hits)) => {
                let candidates = hits
                    .into_iter()
                    .map(|hit| Candidate {
                        id: hit.id,
                        source: CandidateSource::Structured,
                        score: self.config.structured_score,
                        metadata: hit.payload,
                        provenance: Provenance {
                            collections: Vec::new(),
                            query_vector_sources: Vec::new(),
                            filters_applied: rendered.clone(),
                        },
                    })
                    .collect();
                Ok(SourceOutput::Structured(candidates))
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    event = "search.executor.structured_failed",
                    source = %source.source,
                    error = %error,
                    "structured source failed; continuing without it"
                );
                Err(PipelineError::SourceUnavailable {
                    source_label: label.clone(),
                    message: error.to_string(),
                }
                .entry("executor"))
            }
            Err(_) => {
                tracing::warn!(
                    event = "search.executor.structured_timeout",
                    source = %source.source,
                    budget_ms = budget.as_millis() as u64,
                    "structured source timed out; continuing without it"
                );
                Err(PipelineError::SourceTimeout {
                    source_label: label.clone(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
                .entry("executor"))
            }
        };
        SourceRun {
            label,
            weight,
            latency_ms: started.elapsed().as_millis() as u64,
            result,
        }
    }
}
