//! scout-types - Shared contract types for the Tool Scout pipeline
//!
//! Every boundary in the pipeline (intent extraction, query planning,
//! retrieval, fusion) exchanges one of the types defined here. All types are
//! serde round-trippable so the same structs serve as LLM wire contracts,
//! store payloads and test fixtures.

pub use candidate::{Candidate, CandidateSource, Provenance, SearchResponse, SearchStats, SourceStats};
pub use error::{ErrorEntry, ErrorKind, PipelineError, PipelineResult};
pub use filter::{FilterOperator, FilterPredicate};
pub use intent::{
    ComparisonMode, IntentRecord, Preference, PriceComparison, PriceOperator, PriceRange,
    PrimaryGoal,
};
pub use plan::{
    FusionMethod, PlanStrategy, QueryPlan, QueryVectorSource, RerankerSpec, RerankerType,
    StructuredSource, VectorSource, MAX_REFINEMENT_CYCLES, MAX_TOP_K,
};

pub mod candidate;
pub mod error;
pub mod filter;
pub mod intent;
pub mod plan;
