//! Intent record: structured summary of a user's goal.
//!
//! Produced by the intent extractor from LLM output; every vocabulary-bound
//! field must be an exact member of the corresponding vocabulary (no
//! synonyms, no case variants) before the record crosses into planning.

use serde::{Deserialize, Serialize};

/// What the user is fundamentally trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryGoal {
    /// Locate a specific tool or a class of tools.
    Find,
    /// Compare two or more tools.
    Compare,
    /// Ask for a recommendation.
    Recommend,
    /// Browse a space of tools without a fixed target.
    Explore,
    /// Analyze properties of tools.
    Analyze,
    /// Ask what a tool is or does.
    Explain,
}

/// Relation of the query to a named reference tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// "like X" - similarity search anchored on the reference.
    SimilarTo,
    /// "X vs Y" - head to head comparison.
    Vs,
    /// "alternative to X" - replacements for the reference.
    AlternativeTo,
}

/// A preference field that the model may emit as a scalar or an array.
///
/// Always normalized to an array; a scalar is coerced to a singleton.
/// An empty value means the field was absent from the intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Preference(pub Vec<String>);

impl Preference {
    /// The preference values, empty when absent.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.0
    }

    /// Whether the field was absent or empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }
}

impl From<&str> for Preference {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<Vec<&str>> for Preference {
    fn from(values: Vec<&str>) -> Self {
        Self(values.into_iter().map(str::to_string).collect())
    }
}

impl<'de> Deserialize<'de> for Preference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
            None,
        }
        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(value) => Self(vec![value]),
            OneOrMany::Many(values) => Self(values),
            OneOrMany::None => Self::default(),
        })
    }
}

/// Closed set of numeric price comparison operators.
///
/// The catch-all variant preserves whatever literal the model emitted so the
/// filter builder can fall back to equality with a soft warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceOperator {
    /// `< value`
    LessThan,
    /// `<= value`
    LessThanOrEqual,
    /// `> value`
    GreaterThan,
    /// `>= value`
    GreaterThanOrEqual,
    /// `= value`
    Equal,
    /// `!= value`
    NotEqual,
    /// Symmetric closed interval around the value (±10%).
    Around,
    /// Interval fallback; treated as `[0, value]`.
    Between,
    /// Anything else the model emitted.
    #[serde(untagged)]
    Other(String),
}

/// Explicit price interval extracted from the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    /// Lower bound, inclusive; `null` when open.
    pub min: Option<f64>,
    /// Upper bound, inclusive; `null` when open.
    pub max: Option<f64>,
    /// ISO currency code, when stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Billing period vocabulary term, when stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<String>,
}

/// Single-operator price constraint extracted from the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceComparison {
    /// Comparison operator.
    pub operator: PriceOperator,
    /// Operand; sanitized to `max(0, value)`.
    pub value: f64,
    /// ISO currency code, when stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Billing period vocabulary term, when stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<String>,
}

/// Structured summary of one user query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRecord {
    /// Required primary goal.
    pub primary_goal: PrimaryGoal,
    /// Named reference tool ("Cursor IDE"), when the query anchors on one.
    #[serde(default)]
    pub reference_tool: Option<String>,
    /// Relation to the reference tool.
    #[serde(default)]
    pub comparison_mode: Option<ComparisonMode>,
    /// Category preference; the model may emit `category` or `categories`.
    #[serde(default, alias = "categories")]
    pub category: Preference,
    /// Interface preference (vocabulary-bound).
    #[serde(default)]
    pub interface: Preference,
    /// Functionality / feature tags (vocabulary-bound).
    #[serde(default)]
    pub functionality: Preference,
    /// Deployment preference (vocabulary-bound).
    #[serde(default)]
    pub deployment: Preference,
    /// Industry preference (vocabulary-bound).
    #[serde(default)]
    pub industry: Preference,
    /// User-type preference (vocabulary-bound).
    #[serde(default)]
    pub user_type: Preference,
    /// Pricing model preference (vocabulary-bound).
    #[serde(default)]
    pub pricing_model: Preference,
    /// Billing period preference (vocabulary-bound).
    #[serde(default)]
    pub billing_period: Preference,
    /// Explicit price interval, when extracted.
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    /// Single-operator price constraint, when extracted.
    #[serde(default)]
    pub price_comparison: Option<PriceComparison>,
    /// Alternative phrasings of the query for variant embedding.
    #[serde(default)]
    pub semantic_variants: Vec<String>,
    /// Free-form constraints that do not map to a vocabulary.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f64,
}

impl IntentRecord {
    /// Minimal record used as a seed in tests and fallbacks.
    #[must_use]
    pub fn with_goal(primary_goal: PrimaryGoal) -> Self {
        Self {
            primary_goal,
            reference_tool: None,
            comparison_mode: None,
            category: Preference::default(),
            interface: Preference::default(),
            functionality: Preference::default(),
            deployment: Preference::default(),
            industry: Preference::default(),
            user_type: Preference::default(),
            pricing_model: Preference::default(),
            billing_period: Preference::default(),
            price_range: None,
            price_comparison: None,
            semantic_variants: Vec::new(),
            constraints: Vec::new(),
            confidence: 0.0,
        }
    }
}
