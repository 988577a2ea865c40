//! The one-call search facade.
//!
//! `search(query, options)` runs the full chain - intent extraction, query
//! planning, fan-out execution - and always returns a response: fatal
//! request errors come back as zero candidates plus a structured error list,
//! never as a panic or a lost future.

use std::sync::Arc;
use std::time::{Duration, Instant};

use scout_planner::{IntentExtractor, LlmClient, QueryPlanner};
use scout_schema::{DomainSchema, ValidationReport};
use scout_types::{
    ErrorEntry, ErrorKind, FusionMethod, PipelineResult, SearchResponse, SearchStats,
};

use crate::cache::ResultCache;
use crate::config::PipelineConfig;
use crate::embedding::Embedder;
use crate::executor::{Executor, ExecutorConfig};
use crate::structured::StructuredStore;
use crate::vector::VectorSearch;

/// Longest deadline a caller may request.
const MAX_DEADLINE_MS: u64 = 120_000;

/// Per-request options of the search operation.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Attach the validated plan and the intent record to the response.
    pub debug: bool,
    /// Overall deadline in milliseconds; defaults to the configured value.
    pub deadline_ms: Option<u64>,
    /// Opaque session identifier, logged but not interpreted.
    pub session_id: Option<String>,
}

/// Validate a search request before any model call.
///
/// # Errors
///
/// Returns a message describing the rejected field.
pub fn validate_search_request(query: &str, options: &SearchOptions) -> Result<(), String> {
    if query.trim().is_empty() {
        return Err("query must be non-empty".to_string());
    }
    if let Some(deadline) = options.deadline_ms
        && !(1..=MAX_DEADLINE_MS).contains(&deadline)
    {
        return Err(format!(
            "deadlineMs {deadline} outside [1, {MAX_DEADLINE_MS}]"
        ));
    }
    Ok(())
}

/// Wired pipeline: schema + collaborators + executor + optional cache.
pub struct SearchPipeline {
    extractor: IntentExtractor,
    planner: QueryPlanner,
    executor: Executor,
    cache: Option<ResultCache>,
    config: PipelineConfig,
}

impl SearchPipeline {
    /// Wire a pipeline; validates the schema and fails startup on errors.
    ///
    /// # Errors
    ///
    /// [`scout_types::PipelineError::SchemaInvalid`] aggregating every
    /// schema error.
    pub fn new(
        schema: DomainSchema,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorSearch>,
        structured: Arc<dyn StructuredStore>,
        config: PipelineConfig,
    ) -> PipelineResult<Self> {
        ValidationReport::assert_valid(&schema)?;
        let report = ValidationReport::validate(&schema);
        for warning in &report.warnings {
            tracing::warn!(
                event = "search.pipeline.schema_warning",
                path = %warning.path,
                message = %warning.message,
                "schema warning at startup"
            );
        }
        let schema = Arc::new(schema);
        let extractor = IntentExtractor::new(Arc::clone(&llm), Arc::clone(&schema));
        let planner = QueryPlanner::new(llm, Arc::clone(&schema));
        let executor_config = ExecutorConfig {
            structured_score: 0.5,
            score_threshold: config.score_threshold,
            ..ExecutorConfig::default()
        };
        let executor = Executor::new(embedder, vector, structured, executor_config);
        let cache = config
            .enable_cache
            .then(|| ResultCache::new(config.cache_ttl_seconds));
        Ok(Self {
            extractor,
            planner,
            executor,
            cache,
            config,
        })
    }

    /// Replace the executor budgets (timeouts, structured score).
    #[must_use]
    pub fn with_executor_config(mut self, executor_config: ExecutorConfig) -> Self {
        self.executor = self.executor.with_config(executor_config);
        self
    }

    /// Cache counters, when the cache is enabled.
    #[must_use]
    pub fn cache_stats(&self) -> Option<crate::cache::CacheStatsSnapshot> {
        self.cache.as_ref().map(ResultCache::stats)
    }

    /// Run one search request end to end.
    pub async fn search(&self, query: &str, options: SearchOptions) -> SearchResponse {
        let started = Instant::now();
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut errors: Vec<ErrorEntry> = Vec::new();

        tracing::info!(
            event = "search.pipeline.request",
            request_id = %request_id,
            session_id = options.session_id.as_deref().unwrap_or(""),
            debug = options.debug,
            "search request received"
        );

        if let Err(message) = validate_search_request(query, &options) {
            errors.push(ErrorEntry::fatal("request-validation", ErrorKind::ExtractionFailed, message));
            return self.respond(request_id, started, Vec::new(), Vec::new(), FusionMethod::None, false, errors, None, None, options.debug);
        }

        let deadline_ms = options.deadline_ms.unwrap_or(self.config.deadline_ms);
        let digest = format!("deadline={deadline_ms}");
        if let Some(cache) = &self.cache
            && let Some((candidates, fusion)) = cache.get(query, &digest)
        {
            tracing::debug!(
                event = "search.pipeline.cache_hit",
                request_id = %request_id,
                candidates = candidates.len(),
                "served from result cache"
            );
            return self.respond(request_id, started, candidates, Vec::new(), fusion, true, errors, None, None, options.debug);
        }

        let intent = match self.extractor.extract(query).await {
            Ok(intent) => intent,
            Err(error) => {
                errors.push(error.entry("intent-extractor"));
                return self.respond(request_id, started, Vec::new(), Vec::new(), FusionMethod::None, false, errors, None, None, options.debug);
            }
        };

        let planned = match self.planner.plan(query, &intent).await {
            Ok(planned) => planned,
            Err(error) => {
                errors.push(error.entry("query-planner"));
                return self.respond(request_id, started, Vec::new(), Vec::new(), FusionMethod::None, false, errors, None, Some(intent), options.debug);
            }
        };
        for warning in &planned.warnings {
            errors.push(ErrorEntry::recovered(
                "query-planner",
                ErrorKind::PlanInvalid,
                warning.clone(),
            ));
        }

        let deadline = Duration::from_millis(deadline_ms);
        let outcome = match self
            .executor
            .execute(&planned.plan, query, &intent, Some(deadline))
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                errors.push(error.entry("executor"));
                return self.respond(request_id, started, Vec::new(), Vec::new(), FusionMethod::None, false, errors, Some(planned.plan), Some(intent), options.debug);
            }
        };
        errors.extend(outcome.errors);

        if let Some(cache) = &self.cache
            && !outcome.candidates.is_empty()
        {
            cache.set(query, &digest, outcome.candidates.clone(), outcome.fusion_applied);
        }

        self.respond(
            request_id,
            started,
            outcome.candidates,
            outcome.source_stats,
            outcome.fusion_applied,
            false,
            errors,
            Some(planned.plan),
            Some(intent),
            options.debug,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn respond(
        &self,
        request_id: String,
        started: Instant,
        candidates: Vec<scout_types::Candidate>,
        sources: Vec<scout_types::SourceStats>,
        fusion_applied: FusionMethod,
        cache_hit: bool,
        errors: Vec<ErrorEntry>,
        plan: Option<scout_types::QueryPlan>,
        intent: Option<scout_types::IntentRecord>,
        debug: bool,
    ) -> SearchResponse {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            event = "search.pipeline.completed",
            request_id = %request_id,
            candidates = candidates.len(),
            errors = errors.len(),
            elapsed_ms,
            cache_hit,
            "search request completed"
        );
        SearchResponse {
            candidates,
            stats: SearchStats {
                request_id,
                sources,
                fusion_applied,
                elapsed_ms,
                cache_hit,
            },
            errors,
            plan: debug.then_some(plan).flatten(),
            intent: debug.then_some(intent).flatten(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_validation_rejects_empty_query_and_bad_deadline() {
        assert!(validate_search_request("free tools", &SearchOptions::default()).is_ok());
        assert!(validate_search_request("  ", &SearchOptions::default()).is_err());
        let options = SearchOptions {
            deadline_ms: Some(0),
            ..SearchOptions::default()
        };
        assert!(validate_search_request("q", &options).is_err());
        let options = SearchOptions {
            deadline_ms: Some(MAX_DEADLINE_MS + 1),
            ..SearchOptions::default()
        };
        assert!(validate_search_request("q", &options).is_err());
    }
}
