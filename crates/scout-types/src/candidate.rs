//! Candidates and the response envelope returned by the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::ErrorEntry;
use crate::intent::IntentRecord;
use crate::plan::{FusionMethod, QueryPlan, QueryVectorSource};

/// Which retrieval path produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// A vector-collection search.
    Vector,
    /// The structured store.
    Structured,
    /// Merged across sources during fusion.
    Fusion,
}

/// Where a candidate came from; merged by set union during dedup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Vector collections that returned this candidate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<String>,
    /// Query-vector sources used for those collections.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_vector_sources: Vec<QueryVectorSource>,
    /// Rendered filters the structured path applied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters_applied: Vec<String>,
}

impl Provenance {
    /// Merge another provenance into this one (set union, order preserved).
    pub fn merge(&mut self, other: &Self) {
        for collection in &other.collections {
            if !self.collections.contains(collection) {
                self.collections.push(collection.clone());
            }
        }
        for source in &other.query_vector_sources {
            if !self.query_vector_sources.contains(source) {
                self.query_vector_sources.push(*source);
            }
        }
        for filter in &other.filters_applied {
            if !self.filters_applied.contains(filter) {
                self.filters_applied.push(filter.clone());
            }
        }
    }
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Stable identifier; the deduplication key.
    pub id: String,
    /// Retrieval path that produced the representative score.
    pub source: CandidateSource,
    /// Normalized score in `[0, 1]`.
    pub score: f64,
    /// Store payload for the candidate.
    pub metadata: serde_json::Value,
    /// Merged origin information.
    #[serde(default)]
    pub provenance: Provenance,
}

/// Per-source execution statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    /// Source label, e.g. `vector:tools` or `structured:tools`.
    pub source: String,
    /// Wall-clock latency of the source call.
    pub latency_ms: u64,
    /// Raw result count before fusion.
    pub result_count: usize,
    /// Whether the source failed or timed out.
    pub failed: bool,
}

/// Execution statistics for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Request identifier.
    pub request_id: String,
    /// Per-source latency and counts.
    pub sources: Vec<SourceStats>,
    /// Fusion method actually applied.
    pub fusion_applied: FusionMethod,
    /// Total pipeline wall-clock time.
    pub elapsed_ms: u64,
    /// Whether the result came from the in-process cache.
    #[serde(default)]
    pub cache_hit: bool,
}

/// Response envelope of the `search` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Ranked, deduplicated candidates.
    pub candidates: Vec<Candidate>,
    /// Execution statistics.
    pub stats: SearchStats,
    /// Fatal errors and recovered warnings, in occurrence order.
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
    /// Validated plan; attached in debug mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<QueryPlan>,
    /// Extracted intent; attached in debug mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentRecord>,
}
