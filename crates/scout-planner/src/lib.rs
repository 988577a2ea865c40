//! scout-planner - From raw query to validated query plan
//!
//! - Intent extraction: query + schema-generated prompt → validated
//!   [`scout_types::IntentRecord`] (vocabulary closure enforced).
//! - Filter building: intent → ordered typed predicates (pure).
//! - Planning: deterministic intent analysis + LLM planning call +
//!   post-validation/enhancement → validated [`scout_types::QueryPlan`].

pub use analysis::{AnalysisStrategy, IntentAnalysis, analyze_intent};
pub use filters::{BuiltFilters, FilterTargets, build_filters};
pub use intent::IntentExtractor;
pub use llm::{HttpLlmClient, LlmClient, LlmError};
pub use planner::{PlannedQuery, QueryPlanner};
pub use validate::{PlanCheck, ensure_filter_sequences, validate_plan};

pub mod analysis;
pub mod filters;
pub mod intent;
pub mod llm;
pub mod planner;
pub mod validate;
