//! Error types for the search pipeline.
//!
//! Two layers: [`PipelineError`] is the terminal error propagated with `?`;
//! [`ErrorEntry`] is the structured record accumulated in the response for
//! both fatal and locally recovered faults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type with pipeline-specific error.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Closed set of error kinds carried by every error entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Domain schema failed startup validation.
    SchemaInvalid,
    /// LLM produced no parsable intent structure.
    ExtractionFailed,
    /// A vocabulary-bound field carried a value outside its vocabulary.
    VocabularyMismatch,
    /// Query plan failed structural validation.
    PlanInvalid,
    /// A retrieval source failed; recovered locally.
    SourceUnavailable,
    /// A retrieval source exceeded its soft deadline; recovered locally.
    SourceTimeout,
    /// The overall request deadline was hit; partial results returned.
    DeadlineExceeded,
    /// Zero candidates; not an error, carries an explanation.
    EmptyResult,
}

/// Structured error record returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Pipeline node that produced the error (e.g. `query-planner`).
    pub node: String,
    /// Error kind tag.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// When the error was recorded.
    pub timestamp: DateTime<Utc>,
    /// Whether the pipeline recovered locally and continued.
    pub recovered: bool,
}

impl ErrorEntry {
    /// Record a locally recovered fault.
    #[must_use]
    pub fn recovered(node: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            node: node.to_string(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            recovered: true,
        }
    }

    /// Record a fatal fault.
    #[must_use]
    pub fn fatal(node: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            node: node.to_string(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            recovered: false,
        }
    }
}

/// Terminal error for pipeline operations.
///
/// I/O faults inside the executor are recovered locally and never surface
/// through this type; structural faults (schema, vocabulary, plan) always do.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Domain schema failed validation; message aggregates all errors.
    #[error("schema invalid: {0}")]
    SchemaInvalid(String),

    /// The model produced no parsable intent structure.
    #[error("intent extraction failed: {0}")]
    ExtractionFailed(String),

    /// A vocabulary-bound field carried a value outside its vocabulary.
    #[error("vocabulary mismatch: field `{field}` has value `{value}` outside the allowed set")]
    VocabularyMismatch {
        /// Offending intent/plan field.
        field: String,
        /// Offending value.
        value: String,
    },

    /// Query plan failed structural validation.
    #[error("query plan invalid: {0}")]
    PlanInvalid(String),

    /// A retrieval source is unreachable.
    #[error("source `{source_label}` unavailable: {message}")]
    SourceUnavailable {
        /// Source label (e.g. `vector:tools`).
        source_label: String,
        /// Transport-level detail.
        message: String,
    },

    /// A retrieval source exceeded its soft deadline.
    #[error("source `{source_label}` timed out after {elapsed_ms}ms")]
    SourceTimeout {
        /// Source label.
        source_label: String,
        /// Elapsed time when aborted.
        elapsed_ms: u64,
    },

    /// The overall request deadline was exceeded.
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl PipelineError {
    /// Error kind tag for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaInvalid(_) => ErrorKind::SchemaInvalid,
            Self::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
            Self::VocabularyMismatch { .. } => ErrorKind::VocabularyMismatch,
            Self::PlanInvalid(_) => ErrorKind::PlanInvalid,
            Self::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Self::SourceTimeout { .. } => ErrorKind::SourceTimeout,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }

    /// Convert into a structured entry attributed to `node`.
    #[must_use]
    pub fn entry(&self, node: &str) -> ErrorEntry {
        let recovered = matches!(
            self,
            Self::SourceUnavailable { .. } | Self::SourceTimeout { .. }
        );
        ErrorEntry {
            node: node.to_string(),
            kind: self.kind(),
            message: self.to_string(),
            timestamp: Utc::now(),
            recovered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_serialize_kebab_case() {
        let json = serde_json::to_string(&ErrorKind::VocabularyMismatch).unwrap();
        assert_eq!(json, "\"vocabulary-mismatch\"");
        let json = serde_json::to_string(&ErrorKind::SourceTimeout).unwrap();
        assert_eq!(json, "\"source-timeout\"");
    }

    #[test]
    fn source_faults_are_marked_recovered() {
        let err = PipelineError::SourceTimeout {
            source_label: "vector:tools".to_string(),
            elapsed_ms: 5000,
        };
        let entry = err.entry("executor");
        assert!(entry.recovered);
        assert_eq!(entry.kind, ErrorKind::SourceTimeout);

        let err = PipelineError::PlanInvalid("bad".to_string());
        assert!(!err.entry("query-planner").recovered);
    }
}
