//! scout-schema - Declarative domain schema and prompt generation
//!
//! The schema is the single source of truth for vocabularies, intent shape,
//! vector collections and the structured database. It is constructed once at
//! startup, validated once and never mutated. Prompts for intent extraction
//! and query planning are generated from it, so the LLM contract and the
//! validators can never drift apart.

pub use domain::{
    DomainSchema, IntentFieldDef, IntentFieldType, StructuredDatabase, VectorCollection,
    Vocabularies, VocabularyAxis,
};
pub use prompts::{PromptGenerator, axis_for_filter_field};
pub use tools::default_tools_schema;
pub use validate::{IssueKind, SchemaIssue, ValidationReport};

pub mod domain;
pub mod prompts;
pub mod tools;
pub mod validate;
