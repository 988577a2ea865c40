//! Prompt generation from the domain schema.
//!
//! Pure text functions: for a fixed schema the output strings are identical
//! across runs. Templates carry named placeholders; all substituted text is
//! derived from the schema, never from request state.

use std::fmt::Write as _;

use crate::domain::{DomainSchema, IntentFieldDef, IntentFieldType, VocabularyAxis};

const INTENT_TEMPLATE: &str = "\
You extract structured search intent for a tools directory.

Return ONLY a JSON object with exactly this shape:
{{INTENT_SKELETON}}

Vocabulary constraints - use EXACT values only, copied verbatim:
{{VOCABULARY_CONSTRAINTS}}

Price extraction rules:
{{PRICE_RULES}}

Never invent vocabulary values. Omit a field (or use null) when the query
says nothing about it. Set confidence to your calibrated certainty in [0, 1].
";

const PLANNING_TEMPLATE: &str = "\
You plan hybrid retrieval over vector collections and a structured store.

Available vector collections:
{{COLLECTIONS}}

Strategy weighting hints:
{{STRATEGY_HINTS}}

Structured filter fields - EXACT values only:
{{FILTER_CATALOG}}

Fusion methods:
{{FUSION_METHODS}}

Return ONLY a JSON object with keys: strategy, vectorSources,
structuredSources, fusion, maxRefinementCycles, explanation, confidence.
Every entry in a `filters` array must be an object with exactly the keys
`field`, `operator` and `value`; `filters` itself is ALWAYS a JSON array,
never an object.
";

const PRICE_RULES: &str = "\
- \"free\" means pricingModel \"Free\", not price 0.
- \"under/below $N\" -> priceComparison {operator: less_than, value: N}.
- \"over/above $N\" -> priceComparison {operator: greater_than, value: N}.
- \"around/about $N\" -> priceComparison {operator: around, value: N}.
- \"between $A and $B\" -> priceRange {min: A, max: B}.
- \"per month\"/\"monthly\" -> billingPeriod \"Monthly\"; \"per year\"/\"yearly\" -> \"Yearly\".
- Prices are plain numbers without currency symbols; never negative.";

const FUSION_METHODS: &str = "\
- rrf: reciprocal rank fusion across three or more ranked lists.
- weighted_sum: weighted normalized scores, for exactly two vector sources.
- concat: concatenation preserving order, when no vector source runs.
- none: single source passed through unchanged.";

/// Generates the intent-extraction and query-planning system prompts.
#[derive(Debug, Clone, Copy)]
pub struct PromptGenerator<'a> {
    schema: &'a DomainSchema,
}

impl<'a> PromptGenerator<'a> {
    /// Bind a generator to a validated schema.
    #[must_use]
    pub fn new(schema: &'a DomainSchema) -> Self {
        Self { schema }
    }

    /// System prompt for the intent extractor.
    #[must_use]
    pub fn intent_prompt(&self) -> String {
        INTENT_TEMPLATE
            .replace("{{INTENT_SKELETON}}", &self.intent_skeleton())
            .replace("{{VOCABULARY_CONSTRAINTS}}", &self.vocabulary_constraints())
            .replace("{{PRICE_RULES}}", PRICE_RULES)
    }

    /// System prompt for the query planner.
    #[must_use]
    pub fn planning_prompt(&self) -> String {
        PLANNING_TEMPLATE
            .replace("{{COLLECTIONS}}", &self.collection_descriptors())
            .replace("{{STRATEGY_HINTS}}", &self.strategy_hints())
            .replace("{{FILTER_CATALOG}}", &self.filter_catalog())
            .replace("{{FUSION_METHODS}}", FUSION_METHODS)
    }

    /// JSON skeleton of the intent record, rendered from the field contract.
    #[must_use]
    pub fn intent_skeleton(&self) -> String {
        let mut out = String::from("{\n");
        let last = self.schema.intent_fields.len().saturating_sub(1);
        for (i, field) in self.schema.intent_fields.iter().enumerate() {
            render_field(&mut out, field, 1, i == last);
        }
        out.push('}');
        out
    }

    /// One constraint line per vocabulary axis, values literal-quoted.
    #[must_use]
    pub fn vocabulary_constraints(&self) -> String {
        let mut out = String::new();
        for axis in VocabularyAxis::ALL {
            let values = self.schema.vocabularies.axis(axis);
            if values.is_empty() {
                continue;
            }
            let quoted: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
            let _ = writeln!(out, "- {}: {}", axis.as_str(), quoted.join(", "));
        }
        out.trim_end().to_string()
    }

    fn collection_descriptors(&self) -> String {
        let mut out = String::new();
        for collection in self.schema.enabled_collections() {
            let _ = writeln!(
                out,
                "- {} (embedding field `{}`, dimension {}): {}",
                collection.name, collection.embedding_field, collection.dimension,
                collection.description
            );
        }
        out.trim_end().to_string()
    }

    fn strategy_hints(&self) -> String {
        "- identity-focused queries: primary collection `tools` at full weight, \
         supportive collection `functionality` at reduced weight.\n\
         - capability-focused queries: primary `functionality`, supportive `tools` and `usecases`.\n\
         - usecase-focused queries: primary `usecases`, supportive `functionality` and `tools`.\n\
         - technical/platform queries: primary `interface`, supportive `tools` and `functionality`.\n\
         - broad or mixed queries: spread weight across `tools` and `functionality`."
            .to_string()
    }

    fn filter_catalog(&self) -> String {
        let mut out = String::new();
        for field in &self.schema.structured_database.filterable_fields {
            let axis = axis_for_filter_field(field);
            match axis {
                Some(axis) => {
                    let quoted: Vec<String> = self
                        .schema
                        .vocabularies
                        .axis(axis)
                        .iter()
                        .map(|v| format!("\"{v}\""))
                        .collect();
                    let _ = writeln!(out, "- {field}: one of {}", quoted.join(", "));
                }
                None => {
                    let _ = writeln!(out, "- {field}: priced-tier array, filter via elemMatch");
                }
            }
        }
        out.trim_end().to_string()
    }
}

/// Vocabulary axis backing a filterable field, if any.
///
/// `pricing` is the priced-tier array and has no vocabulary.
#[must_use]
pub fn axis_for_filter_field(field: &str) -> Option<VocabularyAxis> {
    match field {
        "categories.primary" | "categories" => Some(VocabularyAxis::Categories),
        "functionality" => Some(VocabularyAxis::Functionality),
        "interface" => Some(VocabularyAxis::Interface),
        "deployment" => Some(VocabularyAxis::Deployment),
        "industries" => Some(VocabularyAxis::Industries),
        "userTypes" => Some(VocabularyAxis::UserTypes),
        "pricingModel" => Some(VocabularyAxis::PricingModels),
        "billingPeriod" => Some(VocabularyAxis::BillingPeriods),
        _ => None,
    }
}

fn render_field(out: &mut String, field: &IntentFieldDef, depth: usize, last: bool) {
    let indent = "  ".repeat(depth);
    let value = match field.field_type {
        IntentFieldType::String => scalar_marker("string", field.required),
        IntentFieldType::Number => scalar_marker("number", field.required),
        IntentFieldType::Boolean => scalar_marker("true|false", field.required),
        IntentFieldType::Array => "[\"<string>\", ...]".to_string(),
        IntentFieldType::Enum => {
            let mut joined = field.enum_values.join("|");
            if !field.required {
                joined.push_str("|null");
            }
            format!("\"<{joined}>\"")
        }
        IntentFieldType::Object => {
            let mut nested = String::from("{\n");
            let child_last = field.children.len().saturating_sub(1);
            for (i, child) in field.children.iter().enumerate() {
                render_field(&mut nested, child, depth + 1, i == child_last);
            }
            nested.push_str(&indent);
            nested.push('}');
            if !field.required {
                nested.push_str(" | null");
            }
            nested
        }
    };
    let comma = if last { "" } else { "," };
    let comment = if field.description.is_empty() {
        String::new()
    } else {
        format!("  // {}", field.description)
    };
    let _ = writeln!(out, "{indent}\"{}\": {value}{comma}{comment}", field.name);
}

fn scalar_marker(base: &str, required: bool) -> String {
    if required {
        format!("\"<{base}>\"")
    } else {
        format!("\"<{base}|null>\"")
    }
}
