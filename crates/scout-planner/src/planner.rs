//! Query planner: intent record → validated query plan.
//!
//! Stages: Analyze → Prompt → PostValidate → Emit, no loops. The LLM
//! proposes; the deterministic enhancement pass owns the final say on
//! collections, budgets, filters, fusion and strategy.

use std::sync::Arc;
use std::time::Instant;

use scout_schema::{DomainSchema, PromptGenerator};
use scout_types::{
    FusionMethod, IntentRecord, MAX_REFINEMENT_CYCLES, MAX_TOP_K, PipelineError, PipelineResult,
    PlanStrategy, QueryPlan, QueryVectorSource, RerankerSpec, StructuredSource, VectorSource,
};

use crate::analysis::{IntentAnalysis, analyze_intent};
use crate::filters::{FilterTargets, build_filters};
use crate::llm::LlmClient;
use crate::validate::{ensure_filter_sequences, validate_plan};

/// Budget injected for primary collections missing from the model output.
const PRIMARY_TOP_K: u32 = 70;
/// Budget injected for secondary collections.
const SECONDARY_TOP_K: u32 = 40;
/// Budget for model-proposed sources that carry none.
const DEFAULT_TOP_K: u32 = 50;
/// Budget of the single structured source.
const STRUCTURED_LIMIT: u32 = 100;

/// Planner output: the validated plan plus its derivation context.
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    /// Validated, executable plan.
    pub plan: QueryPlan,
    /// Deterministic analysis the plan was built from.
    pub analysis: IntentAnalysis,
    /// Soft warnings collected along the way.
    pub warnings: Vec<String>,
}

/// Turns intent records into validated query plans.
pub struct QueryPlanner {
    llm: Arc<dyn LlmClient>,
    schema: Arc<DomainSchema>,
    system_prompt: String,
    targets: FilterTargets,
}

/// Lenient shape of the raw LLM planning output.
///
/// Parsed field by field: a malformed field degrades to its default instead
/// of discarding the rest of the proposal.
#[derive(Debug, Default)]
struct RawPlan {
    strategy: Option<PlanStrategy>,
    vector_sources: Vec<RawVectorSource>,
    fusion: Option<FusionMethod>,
    reranker: Option<RerankerSpec>,
    max_refinement_cycles: Option<u32>,
    explanation: Option<String>,
    confidence: Option<f64>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVectorSource {
    collection: String,
    #[serde(default)]
    top_k: Option<u32>,
}

impl RawPlan {
    fn from_value(raw: &serde_json::Value) -> Self {
        fn lenient<T: serde::de::DeserializeOwned>(value: Option<&serde_json::Value>) -> Option<T> {
            value.cloned().and_then(|v| serde_json::from_value(v).ok())
        }
        Self {
            strategy: lenient(raw.get("strategy")),
            vector_sources: lenient(raw.get("vectorSources")).unwrap_or_default(),
            fusion: lenient(raw.get("fusion")),
            reranker: lenient(raw.get("reranker")),
            max_refinement_cycles: lenient(raw.get("maxRefinementCycles")),
            explanation: lenient(raw.get("explanation")),
            confidence: lenient(raw.get("confidence")),
        }
    }
}

impl QueryPlanner {
    /// Build a planner; the system prompt is generated once from the schema.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, schema: Arc<DomainSchema>) -> Self {
        let system_prompt = PromptGenerator::new(&schema).planning_prompt();
        let targets = FilterTargets::from_schema(&schema);
        Self {
            llm,
            schema,
            system_prompt,
            targets,
        }
    }

    /// Plan retrieval for one intent.
    ///
    /// # Errors
    ///
    /// [`PipelineError::PlanInvalid`] when the model output cannot be
    /// repaired into a plan that passes validation.
    pub async fn plan(&self, query: &str, intent: &IntentRecord) -> PipelineResult<PlannedQuery> {
        let started = Instant::now();
        let analysis = analyze_intent(intent);

        let user_prompt = self.user_prompt(query, intent, &analysis)?;
        let raw = self
            .llm
            .invoke(&self.system_prompt, &user_prompt)
            .await
            .map_err(|e| {
                tracing::warn!(
                    event = "planner.plan.invoke_failed",
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "planning call failed"
                );
                PipelineError::PlanInvalid(format!("planning call failed: {e}"))
            })?;

        ensure_filter_sequences(&raw).map_err(PipelineError::PlanInvalid)?;
        let raw_plan = RawPlan::from_value(&raw);

        let (plan, mut warnings) = self.enhance(intent, &analysis, raw_plan);

        let check = validate_plan(&plan, &self.schema);
        warnings.extend(check.warnings.clone());
        if !check.is_valid() {
            return Err(PipelineError::PlanInvalid(check.errors.join("; ")));
        }

        tracing::debug!(
            event = "planner.plan.emitted",
            elapsed_ms = started.elapsed().as_millis() as u64,
            strategy = ?plan.strategy,
            vector_sources = plan.vector_sources.len(),
            structured_sources = plan.structured_sources.len(),
            fusion = ?plan.fusion,
            confidence = plan.confidence,
            "query plan emitted"
        );
        Ok(PlannedQuery {
            plan,
            analysis,
            warnings,
        })
    }

    fn user_prompt(
        &self,
        query: &str,
        intent: &IntentRecord,
        analysis: &IntentAnalysis,
    ) -> PipelineResult<String> {
        let intent_json = serde_json::to_string_pretty(intent)
            .map_err(|e| PipelineError::PlanInvalid(format!("intent serialization: {e}")))?;
        Ok(format!(
            "Query: {query}\n\n\
             Extracted intent:\n{intent_json}\n\n\
             Deterministic analysis: strategy {}, primary collections [{}], \
             secondary collections [{}].\n\n\
             Remember: `filters` must be an ARRAY of {{field, operator, value}} \
             objects and vocabulary fields must use EXACT values.",
            analysis.strategy.as_str(),
            analysis.primary.join(", "),
            analysis.secondary.join(", "),
        ))
    }

    /// Post-validation and enhancement of the model proposal.
    fn enhance(
        &self,
        intent: &IntentRecord,
        analysis: &IntentAnalysis,
        raw: RawPlan,
    ) -> (QueryPlan, Vec<String>) {
        let mut warnings = Vec::new();
        let query_vector_source = if intent.reference_tool.is_some() {
            QueryVectorSource::ReferenceToolEmbedding
        } else {
            QueryVectorSource::QueryText
        };

        // Keep model sources on enabled collections, first occurrence wins.
        let mut vector_sources: Vec<VectorSource> = Vec::new();
        for raw_source in raw.vector_sources {
            if vector_sources.iter().any(|s| s.collection == raw_source.collection) {
                continue;
            }
            let Some(collection) = self.schema.collection(&raw_source.collection) else {
                warnings.push(format!(
                    "dropped vector source on unknown collection `{}`",
                    raw_source.collection
                ));
                continue;
            };
            if !collection.enabled {
                warnings.push(format!(
                    "dropped vector source on disabled collection `{}`",
                    raw_source.collection
                ));
                continue;
            }
            vector_sources.push(VectorSource {
                collection: collection.name.clone(),
                embedding_field: collection.embedding_field.clone(),
                query_vector_source,
                top_k: raw_source.top_k.unwrap_or(DEFAULT_TOP_K).clamp(1, MAX_TOP_K),
                weight: Some(analysis.weight_for(&collection.name)),
            });
        }

        // Inject recommended collections the model forgot.
        for (tier, top_k) in [
            (&analysis.primary, PRIMARY_TOP_K),
            (&analysis.secondary, SECONDARY_TOP_K),
        ] {
            for name in tier {
                if vector_sources.iter().any(|s| &s.collection == name) {
                    continue;
                }
                let Some(collection) = self.schema.collection(name) else {
                    continue;
                };
                if !collection.enabled {
                    continue;
                }
                vector_sources.push(VectorSource {
                    collection: collection.name.clone(),
                    embedding_field: collection.embedding_field.clone(),
                    query_vector_source,
                    top_k,
                    weight: Some(analysis.weight_for(&collection.name)),
                });
            }
        }

        // The structured path is rebuilt from the intent, never trusted from
        // the model.
        let built = build_filters(intent, &self.targets);
        warnings.extend(built.warnings);
        let structured_sources = if built.predicates.is_empty() {
            Vec::new()
        } else {
            vec![StructuredSource {
                source: self.schema.structured_database.collection.clone(),
                filters: built.predicates,
                limit: STRUCTURED_LIMIT,
                weight: None,
            }]
        };

        let fusion = match vector_sources.len() {
            0 => FusionMethod::Concat,
            1 => FusionMethod::None,
            2 => FusionMethod::WeightedSum,
            _ => FusionMethod::Rrf,
        };
        if let Some(proposed) = raw.fusion
            && proposed != fusion
        {
            warnings.push(format!(
                "model proposed fusion {proposed:?}; source-count rule selected {fusion:?}"
            ));
        }

        let strategy = if vector_sources.len() > 2 {
            PlanStrategy::MultiVector
        } else if !vector_sources.is_empty() && !structured_sources.is_empty() {
            PlanStrategy::Hybrid
        } else if !vector_sources.is_empty() {
            PlanStrategy::MultiVector
        } else {
            raw.strategy.unwrap_or(PlanStrategy::MetadataOnly)
        };

        let confidence = blend_confidence(
            raw.confidence.unwrap_or(0.5),
            analysis,
            &vector_sources,
            strategy,
        );

        let explanation = raw
            .explanation
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| {
                format!("{} retrieval over the tools directory", analysis.strategy.as_str())
            });

        let plan = QueryPlan {
            strategy,
            vector_sources,
            structured_sources,
            reranker: raw.reranker,
            fusion,
            max_refinement_cycles: raw
                .max_refinement_cycles
                .unwrap_or(0)
                .min(MAX_REFINEMENT_CYCLES),
            explanation,
            confidence,
        };
        (plan, warnings)
    }
}

/// Blend model confidence with primary-collection coverage, boost on a
/// strategy match and round to two decimals.
fn blend_confidence(
    model_confidence: f64,
    analysis: &IntentAnalysis,
    vector_sources: &[VectorSource],
    strategy: PlanStrategy,
) -> f64 {
    let base = model_confidence.clamp(0.0, 1.0);
    let covered = analysis
        .primary
        .iter()
        .filter(|name| vector_sources.iter().any(|s| &s.collection == *name))
        .count();
    let coverage = if analysis.primary.is_empty() {
        1.0
    } else {
        covered as f64 / analysis.primary.len() as f64
    };
    let mut blended = base * (0.7 + 0.3 * coverage);
    if strategy == analysis.implied_plan_strategy() {
        blended = (blended + 0.1).min(1.0);
    }
    (blended * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_schema::default_tools_schema;
    use scout_types::{Preference, PrimaryGoal};

    #[test]
    fn confidence_blend_rounds_to_two_decimals() {
        let intent = IntentRecord::with_goal(PrimaryGoal::Find);
        let analysis = analyze_intent(&intent);
        let sources = vec![VectorSource {
            collection: "tools".to_string(),
            embedding_field: "semantic".to_string(),
            query_vector_source: QueryVectorSource::QueryText,
            top_k: 70,
            weight: Some(1.0),
        }];
        // Full coverage: 0.77 * 1.0 + 0.1 boost (hybrid == implied hybrid).
        let blended = blend_confidence(0.77, &analysis, &sources, PlanStrategy::Hybrid);
        assert!((blended - 0.87).abs() < 1e-9);
        // No boost when strategies differ.
        let blended = blend_confidence(0.77, &analysis, &sources, PlanStrategy::VectorOnly);
        assert!((blended - 0.77).abs() < 1e-9);
        // Zero coverage scales by 0.7.
        let blended = blend_confidence(1.0, &analysis, &[], PlanStrategy::VectorOnly);
        assert!((blended - 0.7).abs() < 1e-9);
    }

    #[test]
    fn filter_targets_resolve_category_alias() {
        let schema = default_tools_schema();
        let targets = FilterTargets::from_schema(&schema);
        assert_eq!(targets.category, "categories.primary");
    }

    #[test]
    fn analysis_weights_feed_vector_sources() {
        let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
        intent.pricing_model = Preference::from("Free");
        let analysis = analyze_intent(&intent);
        assert!((analysis.weight_for("tools") - 1.0).abs() < f64::EPSILON);
    }
}
