//! Domain schema: vocabularies, intent shape, collections, structured store.

use serde::{Deserialize, Serialize};

/// Named vocabulary axes of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VocabularyAxis {
    /// Tool categories ("Code Editor", ...).
    Categories,
    /// Feature tags ("Code Generation", ...).
    Functionality,
    /// Audience ("Developers", ...).
    UserTypes,
    /// Interaction surface ("CLI", "Web", ...).
    Interface,
    /// Hosting model ("Cloud", "Self-Hosted", ...).
    Deployment,
    /// Vertical ("Software Development", ...).
    Industries,
    /// Commercial model ("Free", "Subscription", ...).
    PricingModels,
    /// Billing cadence ("Monthly", ...).
    BillingPeriods,
}

impl VocabularyAxis {
    /// All axes, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Categories,
        Self::Functionality,
        Self::UserTypes,
        Self::Interface,
        Self::Deployment,
        Self::Industries,
        Self::PricingModels,
        Self::BillingPeriods,
    ];

    /// Stable axis name used in prompts and validation messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Functionality => "functionality",
            Self::UserTypes => "userTypes",
            Self::Interface => "interface",
            Self::Deployment => "deployment",
            Self::Industries => "industries",
            Self::PricingModels => "pricingModels",
            Self::BillingPeriods => "billingPeriods",
        }
    }
}

/// Controlled vocabularies: the only admissible values for the
/// corresponding filter fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vocabularies {
    /// Tool categories.
    pub categories: Vec<String>,
    /// Feature tags.
    pub functionality: Vec<String>,
    /// Audience.
    pub user_types: Vec<String>,
    /// Interaction surfaces.
    pub interface: Vec<String>,
    /// Hosting models.
    pub deployment: Vec<String>,
    /// Verticals.
    pub industries: Vec<String>,
    /// Commercial models.
    pub pricing_models: Vec<String>,
    /// Billing cadences.
    pub billing_periods: Vec<String>,
}

impl Vocabularies {
    /// Values of one axis.
    #[must_use]
    pub fn axis(&self, axis: VocabularyAxis) -> &[String] {
        match axis {
            VocabularyAxis::Categories => &self.categories,
            VocabularyAxis::Functionality => &self.functionality,
            VocabularyAxis::UserTypes => &self.user_types,
            VocabularyAxis::Interface => &self.interface,
            VocabularyAxis::Deployment => &self.deployment,
            VocabularyAxis::Industries => &self.industries,
            VocabularyAxis::PricingModels => &self.pricing_models,
            VocabularyAxis::BillingPeriods => &self.billing_periods,
        }
    }

    /// Exact membership check; no synonyms, no case folding.
    #[must_use]
    pub fn contains(&self, axis: VocabularyAxis, value: &str) -> bool {
        self.axis(axis).iter().any(|v| v == value)
    }
}

/// Type of an intent field definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentFieldType {
    /// Free string.
    String,
    /// Number.
    Number,
    /// Boolean.
    Boolean,
    /// Array of strings.
    Array,
    /// Nested object described by `children`.
    Object,
    /// Closed set described by `enum_values`.
    Enum,
}

/// One field in the intent-extraction contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentFieldDef {
    /// Field name as it appears in the LLM JSON skeleton.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub field_type: IntentFieldType,
    /// Whether the extractor must always emit the field.
    #[serde(default)]
    pub required: bool,
    /// One-line description rendered into the prompt.
    #[serde(default)]
    pub description: String,
    /// Admissible values; required for `enum` fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    /// Child fields; only meaningful for `object` fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<IntentFieldDef>,
}

impl IntentFieldDef {
    /// Shorthand constructor.
    #[must_use]
    pub fn new(name: &str, field_type: IntentFieldType, required: bool, description: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required,
            description: description.to_string(),
            enum_values: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Attach enum values.
    #[must_use]
    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = values.iter().map(|v| (*v).to_string()).collect();
        self
    }

    /// Attach child fields.
    #[must_use]
    pub fn with_children(mut self, children: Vec<IntentFieldDef>) -> Self {
        self.children = children;
        self
    }
}

/// One vector collection exposed by the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorCollection {
    /// Collection name.
    pub name: String,
    /// Payload path whose vector is used for similarity search.
    pub embedding_field: String,
    /// Embedding dimension; must be a positive integer.
    pub dimension: u32,
    /// Disabled collections are dropped from plans.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// One-line description rendered into the planning prompt.
    #[serde(default)]
    pub description: String,
}

fn default_enabled() -> bool {
    true
}

/// Structured database descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredDatabase {
    /// Collection (table) holding the tool documents.
    pub collection: String,
    /// Fields used for text search inside the structured store.
    #[serde(default)]
    pub search_fields: Vec<String>,
    /// The only fields filter predicates may target.
    pub filterable_fields: Vec<String>,
    /// Store type; must be one of [`SUPPORTED_STRUCTURED_TYPES`].
    #[serde(rename = "type")]
    pub db_type: String,
}

/// Structured store types the executor knows how to talk to.
pub const SUPPORTED_STRUCTURED_TYPES: [&str; 2] = ["mongodb", "postgres"];

/// Process-wide, immutable domain configuration.
///
/// Constructed once, validated once via [`crate::ValidationReport`], never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSchema {
    /// Domain name; non-empty.
    pub name: String,
    /// Schema version; semver recommended.
    pub version: String,
    /// Controlled vocabularies.
    pub vocabularies: Vocabularies,
    /// Intent-extraction field contract, in prompt order.
    pub intent_fields: Vec<IntentFieldDef>,
    /// Vector collections.
    pub vector_collections: Vec<VectorCollection>,
    /// Structured database descriptor.
    pub structured_database: StructuredDatabase,
}

impl DomainSchema {
    /// Enabled vector collections, in declaration order.
    #[must_use]
    pub fn enabled_collections(&self) -> Vec<&VectorCollection> {
        self.vector_collections.iter().filter(|c| c.enabled).collect()
    }

    /// Look up a collection by name.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&VectorCollection> {
        self.vector_collections.iter().find(|c| c.name == name)
    }

    /// Whether `name` is an enabled collection.
    #[must_use]
    pub fn is_enabled_collection(&self, name: &str) -> bool {
        self.collection(name).is_some_and(|c| c.enabled)
    }

    /// The closed set of embedding fields declared by the schema.
    #[must_use]
    pub fn embedding_fields(&self) -> Vec<&str> {
        self.vector_collections
            .iter()
            .map(|c| c.embedding_field.as_str())
            .collect()
    }

    /// Whether a filter predicate may target `field`.
    #[must_use]
    pub fn is_filterable(&self, field: &str) -> bool {
        self.structured_database
            .filterable_fields
            .iter()
            .any(|f| f == field)
    }
}
