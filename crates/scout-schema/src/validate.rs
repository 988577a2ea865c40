//! Startup validation of the domain schema.
//!
//! Validation collects every problem instead of stopping at the first one;
//! `assert_valid` aggregates all errors into a single structured failure.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use scout_types::{PipelineError, PipelineResult};

use crate::domain::{DomainSchema, IntentFieldDef, IntentFieldType, SUPPORTED_STRUCTURED_TYPES, VocabularyAxis};

/// Distinct validation problem kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Schema `name` is missing or empty.
    EmptyName,
    /// An intent field has an empty name.
    MissingIntentFieldName,
    /// Two intent fields share a name (within one nesting level).
    DuplicateIntentField,
    /// An enum field declares no `enumValues`.
    EnumWithoutValues,
    /// A vector collection declares dimension zero.
    NonPositiveDimension,
    /// `structuredDatabase.collection` is empty.
    MissingCollection,
    /// `structuredDatabase.type` is not a supported store.
    UnknownStructuredType,
    /// `version` is not semver-shaped.
    NonSemverVersion,
    /// A vocabulary axis has no values.
    EmptyVocabulary,
    /// A vocabulary axis repeats a value.
    DuplicateVocabularyEntry,
    /// No vector collection is enabled.
    NoEnabledCollection,
    /// A recommended intent field is absent.
    MissingRecommendedField,
}

/// One validation finding with a prefix-scoped path.
#[derive(Debug, Clone)]
pub struct SchemaIssue {
    /// Problem kind.
    pub kind: IssueKind,
    /// Dotted path of the offending element (e.g. `intentFields.priceRange.operator`).
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

impl SchemaIssue {
    fn new(kind: IssueKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Outcome of schema validation.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// True when no errors were found (warnings allowed).
    pub valid: bool,
    /// Hard errors; any entry makes the schema unusable.
    pub errors: Vec<SchemaIssue>,
    /// Soft findings; the schema is usable but suspicious.
    pub warnings: Vec<SchemaIssue>,
}

impl ValidationReport {
    /// Validate a schema, collecting all errors and warnings.
    #[must_use]
    pub fn validate(schema: &DomainSchema) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if schema.name.trim().is_empty() {
            errors.push(SchemaIssue::new(
                IssueKind::EmptyName,
                "name",
                "schema name must be non-empty",
            ));
        }

        if !is_semver(&schema.version) {
            warnings.push(SchemaIssue::new(
                IssueKind::NonSemverVersion,
                "version",
                format!("version `{}` is not semver-shaped", schema.version),
            ));
        }

        validate_vocabularies(schema, &mut warnings);
        validate_intent_fields(&schema.intent_fields, "intentFields", &mut errors);
        validate_recommended_fields(schema, &mut warnings);
        validate_collections(schema, &mut errors, &mut warnings);
        validate_structured(schema, &mut errors);

        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Validate and fail with a single aggregated error if invalid.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SchemaInvalid`] listing every error found.
    pub fn assert_valid(schema: &DomainSchema) -> PipelineResult<()> {
        let report = Self::validate(schema);
        if report.valid {
            return Ok(());
        }
        let joined = report
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(PipelineError::SchemaInvalid(joined))
    }
}

fn validate_vocabularies(schema: &DomainSchema, warnings: &mut Vec<SchemaIssue>) {
    for axis in VocabularyAxis::ALL {
        let values = schema.vocabularies.axis(axis);
        let path = format!("vocabularies.{}", axis.as_str());
        if values.is_empty() {
            warnings.push(SchemaIssue::new(
                IssueKind::EmptyVocabulary,
                path.clone(),
                "vocabulary axis has no values",
            ));
            continue;
        }
        let mut seen = HashSet::new();
        for value in values {
            if !seen.insert(value.as_str()) {
                warnings.push(SchemaIssue::new(
                    IssueKind::DuplicateVocabularyEntry,
                    path.clone(),
                    format!("duplicate vocabulary entry `{value}`"),
                ));
            }
        }
    }
}

fn validate_intent_fields(fields: &[IntentFieldDef], prefix: &str, errors: &mut Vec<SchemaIssue>) {
    let mut seen = HashSet::new();
    for field in fields {
        let path = format!("{prefix}.{}", field.name);
        if field.name.trim().is_empty() {
            errors.push(SchemaIssue::new(
                IssueKind::MissingIntentFieldName,
                prefix,
                "intent field with empty name",
            ));
            continue;
        }
        if !seen.insert(field.name.as_str()) {
            errors.push(SchemaIssue::new(
                IssueKind::DuplicateIntentField,
                path.clone(),
                format!("duplicate intent field `{}`", field.name),
            ));
        }
        if field.field_type == IntentFieldType::Enum && field.enum_values.is_empty() {
            errors.push(SchemaIssue::new(
                IssueKind::EnumWithoutValues,
                path.clone(),
                "enum field without enumValues",
            ));
        }
        if !field.children.is_empty() {
            // Children are validated recursively with prefix-scoped paths.
            validate_intent_fields(&field.children, &path, errors);
        }
    }
}

fn validate_recommended_fields(schema: &DomainSchema, warnings: &mut Vec<SchemaIssue>) {
    for recommended in ["primaryGoal", "functionality", "confidence"] {
        if !schema.intent_fields.iter().any(|f| f.name == recommended) {
            warnings.push(SchemaIssue::new(
                IssueKind::MissingRecommendedField,
                format!("intentFields.{recommended}"),
                format!("recommended intent field `{recommended}` is missing"),
            ));
        }
    }
}

fn validate_collections(
    schema: &DomainSchema,
    errors: &mut Vec<SchemaIssue>,
    warnings: &mut Vec<SchemaIssue>,
) {
    for collection in &schema.vector_collections {
        if collection.dimension == 0 {
            errors.push(SchemaIssue::new(
                IssueKind::NonPositiveDimension,
                format!("vectorCollections.{}", collection.name),
                "embedding dimension must be a positive integer",
            ));
        }
    }
    if !schema.vector_collections.iter().any(|c| c.enabled) {
        warnings.push(SchemaIssue::new(
            IssueKind::NoEnabledCollection,
            "vectorCollections",
            "no vector collection is enabled",
        ));
    }
}

fn validate_structured(schema: &DomainSchema, errors: &mut Vec<SchemaIssue>) {
    if schema.structured_database.collection.trim().is_empty() {
        errors.push(SchemaIssue::new(
            IssueKind::MissingCollection,
            "structuredDatabase.collection",
            "structured database collection must be set",
        ));
    }
    let db_type = schema.structured_database.db_type.as_str();
    if !SUPPORTED_STRUCTURED_TYPES.contains(&db_type) {
        errors.push(SchemaIssue::new(
            IssueKind::UnknownStructuredType,
            "structuredDatabase.type",
            format!(
                "unknown structured database type `{db_type}` (supported: {})",
                SUPPORTED_STRUCTURED_TYPES.join(", ")
            ),
        ));
    }
}

fn is_semver(version: &str) -> bool {
    static SEMVER_RE: OnceLock<Option<Regex>> = OnceLock::new();
    SEMVER_RE
        .get_or_init(|| {
            Regex::new(r"^\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$").ok()
        })
        .as_ref()
        .is_some_and(|re| re.is_match(version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_tools_schema;

    fn issue_kinds(issues: &[SchemaIssue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn empty_name_is_an_error() {
        let mut schema = default_tools_schema();
        schema.name = "  ".to_string();
        let report = ValidationReport::validate(&schema);
        assert!(!report.valid);
        assert!(issue_kinds(&report.errors).contains(&IssueKind::EmptyName));
    }

    #[test]
    fn duplicate_intent_field_is_an_error() {
        let mut schema = default_tools_schema();
        let clone = schema.intent_fields[0].clone();
        schema.intent_fields.push(clone);
        let report = ValidationReport::validate(&schema);
        assert!(issue_kinds(&report.errors).contains(&IssueKind::DuplicateIntentField));
    }

    #[test]
    fn enum_without_values_is_an_error_with_scoped_path() {
        let mut schema = default_tools_schema();
        // Break a nested child: priceComparison.operator loses its values.
        let price_comparison = schema
            .intent_fields
            .iter_mut()
            .find(|f| f.name == "priceComparison")
            .unwrap();
        price_comparison.children[0].enum_values.clear();
        let report = ValidationReport::validate(&schema);
        let issue = report
            .errors
            .iter()
            .find(|i| i.kind == IssueKind::EnumWithoutValues)
            .unwrap();
        assert_eq!(issue.path, "intentFields.priceComparison.operator");
    }

    #[test]
    fn zero_dimension_is_an_error() {
        let mut schema = default_tools_schema();
        schema.vector_collections[0].dimension = 0;
        let report = ValidationReport::validate(&schema);
        assert!(issue_kinds(&report.errors).contains(&IssueKind::NonPositiveDimension));
    }

    #[test]
    fn unknown_structured_type_is_an_error() {
        let mut schema = default_tools_schema();
        schema.structured_database.db_type = "graphite".to_string();
        let report = ValidationReport::validate(&schema);
        assert!(issue_kinds(&report.errors).contains(&IssueKind::UnknownStructuredType));
    }

    #[test]
    fn soft_findings_are_warnings_not_errors() {
        let mut schema = default_tools_schema();
        schema.version = "v1".to_string();
        schema.vocabularies.industries.clear();
        schema
            .vocabularies
            .interface
            .push("CLI".to_string());
        for collection in &mut schema.vector_collections {
            collection.enabled = false;
        }
        schema.intent_fields.retain(|f| f.name != "confidence");
        let report = ValidationReport::validate(&schema);
        assert!(report.valid);
        let kinds = issue_kinds(&report.warnings);
        assert!(kinds.contains(&IssueKind::NonSemverVersion));
        assert!(kinds.contains(&IssueKind::EmptyVocabulary));
        assert!(kinds.contains(&IssueKind::DuplicateVocabularyEntry));
        assert!(kinds.contains(&IssueKind::NoEnabledCollection));
        assert!(kinds.contains(&IssueKind::MissingRecommendedField));
    }

    #[test]
    fn assert_valid_aggregates_errors() {
        let mut schema = default_tools_schema();
        schema.name = String::new();
        schema.structured_database.collection = String::new();
        let err = ValidationReport::assert_valid(&schema).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("name"));
        assert!(message.contains("structuredDatabase.collection"));
    }
}
