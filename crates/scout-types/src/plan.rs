//! Query plan: declarative description of which vector collections and
//! structured predicates to run, and how to fuse their results.

use serde::{Deserialize, Serialize};

use crate::filter::FilterPredicate;

/// Upper bound on per-source `topK` / `limit`.
pub const MAX_TOP_K: u32 = 200;

/// Upper bound on refinement cycles a plan may request.
pub const MAX_REFINEMENT_CYCLES: u32 = 5;

/// Retrieval strategy of the overall plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanStrategy {
    /// Vector collections plus structured predicates.
    Hybrid,
    /// Several vector collections, no structured path.
    MultiVector,
    /// A single vector collection.
    VectorOnly,
    /// Structured predicates only.
    MetadataOnly,
    /// Knowledge-graph assisted semantic retrieval.
    SemanticKg,
}

/// Where the query vector for a vector source comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryVectorSource {
    /// Embed the original query text.
    QueryText,
    /// Look up the stored vector of the named reference tool.
    ReferenceToolEmbedding,
    /// Embed the first semantic variant of the query.
    SemanticVariant,
}

/// One vector-collection search in the fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSource {
    /// Schema collection name.
    pub collection: String,
    /// Named path inside the collection payload whose vector is searched.
    pub embedding_field: String,
    /// How the query vector is obtained.
    pub query_vector_source: QueryVectorSource,
    /// Result budget for this source, in `[1, 200]`.
    pub top_k: u32,
    /// Fusion weight recommended by the planner; absent means 0.5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// One structured-store query in the fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSource {
    /// Structured store identifier.
    pub source: String,
    /// Ordered predicate sequence; never a map.
    pub filters: Vec<FilterPredicate>,
    /// Result budget for this source, in `[1, 200]`.
    pub limit: u32,
    /// Fusion weight recommended by the planner; absent means 0.5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Reranker family requested by the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RerankerType {
    /// Cross-encoder scoring over fused candidates.
    #[serde(rename = "cross-encoder")]
    CrossEncoder,
    /// Learning-to-rank model.
    #[serde(rename = "LTR")]
    Ltr,
    /// No reranking.
    #[serde(rename = "none")]
    None,
}

/// Optional reranking stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankerSpec {
    /// Reranker family.
    #[serde(rename = "type")]
    pub reranker_type: RerankerType,
    /// Model identifier, when the family needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Cap on candidates handed to the reranker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_candidates: Option<u32>,
}

/// How multi-source result lists are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    /// Reciprocal Rank Fusion.
    Rrf,
    /// Weighted sum of normalized scores.
    WeightedSum,
    /// Concatenation with preserved ordering.
    Concat,
    /// Single source emitted unchanged.
    None,
}

/// Validated, executable query plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    /// Overall retrieval strategy.
    pub strategy: PlanStrategy,
    /// Vector searches to fan out.
    #[serde(default)]
    pub vector_sources: Vec<VectorSource>,
    /// Structured queries to fan out.
    #[serde(default)]
    pub structured_sources: Vec<StructuredSource>,
    /// Optional reranking stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reranker: Option<RerankerSpec>,
    /// Fusion method applied to the joined results.
    pub fusion: FusionMethod,
    /// Refinement cycle budget, in `[0, 5]`.
    #[serde(default)]
    pub max_refinement_cycles: u32,
    /// Prose explanation of why this plan was chosen.
    #[serde(default)]
    pub explanation: String,
    /// Planner confidence in `[0, 1]`.
    pub confidence: f64,
}

impl QueryPlan {
    /// Sum of per-source budgets, capped at [`MAX_TOP_K`].
    ///
    /// This is the truncation bound on the final candidate list.
    #[must_use]
    pub fn total_budget(&self) -> u32 {
        let total: u32 = self
            .vector_sources
            .iter()
            .map(|s| s.top_k)
            .chain(self.structured_sources.iter().map(|s| s.limit))
            .sum();
        total.min(MAX_TOP_K)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strategy_and_fusion_use_wire_literals() {
        assert_eq!(
            serde_json::to_string(&PlanStrategy::MultiVector).unwrap(),
            "\"multi-vector\""
        );
        assert_eq!(
            serde_json::to_string(&FusionMethod::WeightedSum).unwrap(),
            "\"weighted_sum\""
        );
        assert_eq!(
            serde_json::to_string(&QueryVectorSource::ReferenceToolEmbedding).unwrap(),
            "\"reference_tool_embedding\""
        );
    }

    #[test]
    fn plan_round_trips_with_camel_case_keys() {
        let plan: QueryPlan = serde_json::from_value(json!({
            "strategy": "hybrid",
            "vectorSources": [{
                "collection": "tools",
                "embeddingField": "semantic",
                "queryVectorSource": "query_text",
                "topK": 70
            }],
            "structuredSources": [{
                "source": "tools",
                "filters": [{"field": "interface", "operator": "in", "value": ["CLI"]}],
                "limit": 100
            }],
            "fusion": "weighted_sum",
            "maxRefinementCycles": 0,
            "explanation": "identity-focused",
            "confidence": 0.82
        }))
        .unwrap();
        assert_eq!(plan.vector_sources[0].top_k, 70);
        assert_eq!(plan.total_budget(), 170);
    }

    #[test]
    fn total_budget_is_capped() {
        let plan: QueryPlan = serde_json::from_value(json!({
            "strategy": "multi-vector",
            "vectorSources": [
                {"collection": "tools", "embeddingField": "semantic",
                 "queryVectorSource": "query_text", "topK": 150},
                {"collection": "functionality", "embeddingField": "entities.functionality",
                 "queryVectorSource": "query_text", "topK": 150}
            ],
            "fusion": "weighted_sum",
            "confidence": 0.5
        }))
        .unwrap();
        assert_eq!(plan.total_budget(), MAX_TOP_K);
    }
}
