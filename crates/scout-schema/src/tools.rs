//! Built-in schema for the tools directory domain.

use crate::domain::{
    DomainSchema, IntentFieldDef, IntentFieldType, StructuredDatabase, VectorCollection,
    Vocabularies,
};

fn terms(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// The tools-directory domain schema.
///
/// Vocabularies, collections and filterable fields for the production tool
/// catalogue. Callers must run [`crate::ValidationReport`] on the result at
/// startup before wiring it into the pipeline.
#[must_use]
pub fn default_tools_schema() -> DomainSchema {
    let vocabularies = Vocabularies {
        categories: terms(&[
            "AI Assistant",
            "Code Editor",
            "Developer Tools",
            "Productivity",
            "Design",
            "Data & Analytics",
            "Marketing",
            "Customer Support",
        ]),
        functionality: terms(&[
            "Code Generation",
            "Code Completion",
            "Code Review",
            "Chat",
            "Image Generation",
            "Text Generation",
            "Search",
            "Automation",
            "Transcription",
            "Translation",
        ]),
        user_types: terms(&[
            "Developers",
            "Designers",
            "Product Managers",
            "Marketers",
            "Data Scientists",
            "Students",
            "Enterprises",
        ]),
        interface: terms(&[
            "Web",
            "CLI",
            "IDE Extension",
            "Desktop App",
            "Mobile App",
            "API",
            "Browser Extension",
        ]),
        deployment: terms(&["Cloud", "Self-Hosted", "Hybrid", "On-Premise"]),
        industries: terms(&[
            "Software Development",
            "Healthcare",
            "Finance",
            "Education",
            "E-Commerce",
            "Media",
            "Legal",
        ]),
        pricing_models: terms(&[
            "Free",
            "Freemium",
            "Subscription",
            "Pay-Per-Use",
            "One-Time Purchase",
            "Open Source",
        ]),
        billing_periods: terms(&["Monthly", "Yearly", "One-Time", "Per-Use"]),
    };

    let price_children = vec![
        IntentFieldDef::new("min", IntentFieldType::Number, false, "lower bound or null"),
        IntentFieldDef::new("max", IntentFieldType::Number, false, "upper bound or null"),
        IntentFieldDef::new("currency", IntentFieldType::String, false, "ISO currency code"),
        IntentFieldDef::new(
            "billingPeriod",
            IntentFieldType::Enum,
            false,
            "billing cadence",
        )
        .with_enum(&["Monthly", "Yearly", "One-Time", "Per-Use"]),
    ];

    let comparison_children = vec![
        IntentFieldDef::new("operator", IntentFieldType::Enum, true, "comparison operator")
            .with_enum(&[
                "less_than",
                "less_than_or_equal",
                "greater_than",
                "greater_than_or_equal",
                "equal",
                "not_equal",
                "around",
                "between",
            ]),
        IntentFieldDef::new("value", IntentFieldType::Number, true, "numeric operand"),
        IntentFieldDef::new("currency", IntentFieldType::String, false, "ISO currency code"),
        IntentFieldDef::new(
            "billingPeriod",
            IntentFieldType::Enum,
            false,
            "billing cadence",
        )
        .with_enum(&["Monthly", "Yearly", "One-Time", "Per-Use"]),
    ];

    let intent_fields = vec![
        IntentFieldDef::new(
            "primaryGoal",
            IntentFieldType::Enum,
            true,
            "what the user fundamentally wants",
        )
        .with_enum(&["find", "compare", "recommend", "explore", "analyze", "explain"]),
        IntentFieldDef::new(
            "referenceTool",
            IntentFieldType::String,
            false,
            "named tool the query anchors on, or null",
        ),
        IntentFieldDef::new(
            "comparisonMode",
            IntentFieldType::Enum,
            false,
            "relation to the reference tool, or null",
        )
        .with_enum(&["similar_to", "vs", "alternative_to"]),
        IntentFieldDef::new(
            "category",
            IntentFieldType::Array,
            false,
            "tool categories, EXACT vocabulary values",
        ),
        IntentFieldDef::new(
            "interface",
            IntentFieldType::Array,
            false,
            "interaction surfaces, EXACT vocabulary values",
        ),
        IntentFieldDef::new(
            "functionality",
            IntentFieldType::Array,
            false,
            "feature tags, EXACT vocabulary values",
        ),
        IntentFieldDef::new(
            "deployment",
            IntentFieldType::Array,
            false,
            "hosting models, EXACT vocabulary values",
        ),
        IntentFieldDef::new(
            "industry",
            IntentFieldType::Array,
            false,
            "industries, EXACT vocabulary values",
        ),
        IntentFieldDef::new(
            "userType",
            IntentFieldType::Array,
            false,
            "audience, EXACT vocabulary values",
        ),
        IntentFieldDef::new(
            "pricingModel",
            IntentFieldType::Array,
            false,
            "commercial models, EXACT vocabulary values",
        ),
        IntentFieldDef::new(
            "billingPeriod",
            IntentFieldType::Array,
            false,
            "billing cadences, EXACT vocabulary values",
        ),
        IntentFieldDef::new(
            "priceRange",
            IntentFieldType::Object,
            false,
            "explicit price interval, or null",
        )
        .with_children(price_children),
        IntentFieldDef::new(
            "priceComparison",
            IntentFieldType::Object,
            false,
            "single-operator price constraint, or null",
        )
        .with_children(comparison_children),
        IntentFieldDef::new(
            "semanticVariants",
            IntentFieldType::Array,
            false,
            "alternative phrasings of the query",
        ),
        IntentFieldDef::new(
            "constraints",
            IntentFieldType::Array,
            false,
            "free-form constraints that fit no vocabulary",
        ),
        IntentFieldDef::new(
            "confidence",
            IntentFieldType::Number,
            true,
            "extraction confidence between 0 and 1",
        ),
    ];

    let vector_collections = vec![
        VectorCollection {
            name: "tools".to_string(),
            embedding_field: "semantic".to_string(),
            dimension: 1536,
            enabled: true,
            description: "tool identity: name, tagline, long description".to_string(),
        },
        VectorCollection {
            name: "functionality".to_string(),
            embedding_field: "entities.functionality".to_string(),
            dimension: 1536,
            enabled: true,
            description: "capability space: what each tool can do".to_string(),
        },
        VectorCollection {
            name: "usecases".to_string(),
            embedding_field: "entities.usecases".to_string(),
            dimension: 1536,
            enabled: true,
            description: "scenario space: problems tools are used for".to_string(),
        },
        VectorCollection {
            name: "interface".to_string(),
            embedding_field: "entities.interface".to_string(),
            dimension: 1536,
            enabled: true,
            description: "platform space: how tools are operated and deployed".to_string(),
        },
    ];

    let structured_database = StructuredDatabase {
        collection: "tools".to_string(),
        search_fields: terms(&["name", "description", "tags"]),
        filterable_fields: terms(&[
            "categories.primary",
            "functionality",
            "interface",
            "deployment",
            "industries",
            "userTypes",
            "pricingModel",
            "billingPeriod",
            "pricing",
        ]),
        db_type: "mongodb".to_string(),
    };

    DomainSchema {
        name: "tools-directory".to_string(),
        version: "1.2.0".to_string(),
        vocabularies,
        intent_fields,
        vector_collections,
        structured_database,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationReport;

    #[test]
    fn builtin_schema_is_valid() {
        let schema = default_tools_schema();
        let report = ValidationReport::validate(&schema);
        assert!(report.valid, "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    }

    #[test]
    fn builtin_schema_declares_scenario_fields() {
        let schema = default_tools_schema();
        assert!(schema.is_filterable("categories.primary"));
        assert!(schema.is_filterable("pricing"));
        assert_eq!(
            schema.collection("functionality").map(|c| c.embedding_field.as_str()),
            Some("entities.functionality")
        );
    }
}
