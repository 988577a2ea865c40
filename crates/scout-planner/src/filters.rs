//! Filter builder: intent record → ordered typed predicates.
//!
//! Pure, deterministic and total. Rule order is a testable contract:
//! price range, then price comparison, then preference fields in the order
//! category, interface, deployment, functionality, pricing model.

use serde_json::{Map, Value, json};

use scout_schema::DomainSchema;
use scout_types::{FilterPredicate, IntentRecord, Preference, PriceOperator};

/// Structured-store field names the builder targets.
///
/// Resolved from `structuredDatabase.filterableFields`, the single source of
/// truth when a field is known under alternate names.
#[derive(Debug, Clone)]
pub struct FilterTargets {
    /// Category field (`categories.primary` preferred over `categories`).
    pub category: String,
    /// Interface field.
    pub interface: String,
    /// Deployment field.
    pub deployment: String,
    /// Functionality field.
    pub functionality: String,
    /// Pricing model field.
    pub pricing_model: String,
    /// Priced-tier array field.
    pub pricing: String,
}

impl FilterTargets {
    /// Resolve target names from the schema's filterable fields.
    #[must_use]
    pub fn from_schema(schema: &DomainSchema) -> Self {
        let pick = |preferred: &str, fallback: &str| {
            if schema.is_filterable(preferred) {
                preferred.to_string()
            } else {
                fallback.to_string()
            }
        };
        Self {
            category: pick("categories.primary", "categories"),
            interface: "interface".to_string(),
            deployment: "deployment".to_string(),
            functionality: "functionality".to_string(),
            pricing_model: "pricingModel".to_string(),
            pricing: "pricing".to_string(),
        }
    }
}

/// Builder output: predicates plus soft warnings.
#[derive(Debug, Clone, Default)]
pub struct BuiltFilters {
    /// Ordered predicate sequence.
    pub predicates: Vec<FilterPredicate>,
    /// Soft warnings (e.g. unknown price operator fallback).
    pub warnings: Vec<String>,
}

/// Build the filter sequence for one intent record.
#[must_use]
pub fn build_filters(intent: &IntentRecord, targets: &FilterTargets) -> BuiltFilters {
    let mut out = BuiltFilters::default();

    if let Some(range) = &intent.price_range {
        if let Some(conditions) = price_range_conditions(
            range.min.map(sanitize_price),
            range.max.map(sanitize_price),
            range.billing_period.as_deref(),
        ) {
            out.predicates
                .push(FilterPredicate::elem_match(&targets.pricing, conditions));
        }
    }

    if let Some(cmp) = &intent.price_comparison {
        let value = sanitize_price(cmp.value);
        let price = match &cmp.operator {
            PriceOperator::LessThan => json!({"<": value}),
            PriceOperator::LessThanOrEqual => json!({"<=": value}),
            PriceOperator::GreaterThan => json!({">": value}),
            PriceOperator::GreaterThanOrEqual => json!({">=": value}),
            PriceOperator::Equal => json!(value),
            PriceOperator::NotEqual => json!({"!=": value}),
            PriceOperator::Around => {
                // ±10% closed interval, ordinary rounding, ties away from zero.
                let lo = (value * 0.9).round() as i64;
                let hi = (value * 1.1).round() as i64;
                json!({">=": lo, "<=": hi})
            }
            PriceOperator::Between => json!({">=": 0.0, "<=": value}),
            PriceOperator::Other(op) => {
                out.warnings
                    .push(format!("unknown price operator `{op}`, falling back to equality"));
                json!(value)
            }
        };
        let mut conditions = Map::new();
        if let Some(period) = cmp.billing_period.as_deref() {
            conditions.insert("billingPeriod".to_string(), json!(period));
        }
        conditions.insert("price".to_string(), price);
        out.predicates.push(FilterPredicate::elem_match(
            &targets.pricing,
            Value::Object(conditions),
        ));
    }

    push_preference(&mut out.predicates, &targets.category, &intent.category);
    push_preference(&mut out.predicates, &targets.interface, &intent.interface);
    push_preference(&mut out.predicates, &targets.deployment, &intent.deployment);
    push_preference(&mut out.predicates, &targets.functionality, &intent.functionality);
    push_preference(&mut out.predicates, &targets.pricing_model, &intent.pricing_model);

    out
}

fn price_range_conditions(
    min: Option<f64>,
    max: Option<f64>,
    billing_period: Option<&str>,
) -> Option<Value> {
    let price = match (min, max) {
        (Some(min), Some(max)) => json!({">=": min, "<=": max}),
        (Some(min), None) => json!({">=": min}),
        (None, Some(max)) => json!({"<=": max}),
        (None, None) => return None,
    };
    let mut conditions = Map::new();
    if let Some(period) = billing_period {
        conditions.insert("billingPeriod".to_string(), json!(period));
    }
    conditions.insert("price".to_string(), price);
    Some(Value::Object(conditions))
}

fn push_preference(predicates: &mut Vec<FilterPredicate>, field: &str, values: &Preference) {
    if values.is_empty() {
        return;
    }
    predicates.push(FilterPredicate::is_in(field, values.values().to_vec()));
}

fn sanitize_price(value: f64) -> f64 {
    value.max(0.0)
}
