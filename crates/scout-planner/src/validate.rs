//! Plan validation against the domain schema.
//!
//! Typed parsing already guarantees shape; this pass checks the semantic
//! invariants: collection membership, embedding fields, budget bounds and
//! the filters-are-a-sequence contract on the raw LLM output.

use scout_schema::DomainSchema;
use scout_types::{MAX_REFINEMENT_CYCLES, MAX_TOP_K, QueryPlan};

/// Sanity ceiling beyond which an out-of-range budget is an error, not a
/// warning.
const BUDGET_SANITY_CAP: u32 = 1000;

/// Validation outcome; any error invalidates the plan.
#[derive(Debug, Clone, Default)]
pub struct PlanCheck {
    /// Hard violations.
    pub errors: Vec<String>,
    /// Soft findings.
    pub warnings: Vec<String>,
}

impl PlanCheck {
    /// Whether the plan passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Guard against the object-shaped filter representation.
///
/// LLMs tend to emit `"filters": {"field": "value"}` maps; those leak type
/// confusion into the executor, so they are rejected before typed parsing
/// (which would silently fail the whole plan with a less precise message).
///
/// # Errors
///
/// Returns a description of the first offending structured source.
pub fn ensure_filter_sequences(raw_plan: &serde_json::Value) -> Result<(), String> {
    let Some(sources) = raw_plan.get("structuredSources") else {
        return Ok(());
    };
    let Some(sources) = sources.as_array() else {
        return Err("structuredSources must be an array".to_string());
    };
    for (i, source) in sources.iter().enumerate() {
        match source.get("filters") {
            None | Some(serde_json::Value::Null) => {}
            Some(serde_json::Value::Array(filters)) => {
                for (j, filter) in filters.iter().enumerate() {
                    if !filter.is_object() {
                        return Err(format!(
                            "structuredSources[{i}].filters[{j}] must be an object with field/operator/value"
                        ));
                    }
                }
            }
            Some(_) => {
                return Err(format!(
                    "structuredSources[{i}].filters must be a sequence of {{field, operator, value}}, not a map"
                ));
            }
        }
    }
    Ok(())
}

/// Validate a typed plan against the schema.
#[must_use]
pub fn validate_plan(plan: &QueryPlan, schema: &DomainSchema) -> PlanCheck {
    let mut check = PlanCheck::default();
    let embedding_fields = schema.embedding_fields();

    for (i, source) in plan.vector_sources.iter().enumerate() {
        let label = format!("vectorSources[{i}]");
        if schema.collection(&source.collection).is_none() {
            check
                .errors
                .push(format!("{label}: unknown collection `{}`", source.collection));
        }
        if !embedding_fields.contains(&source.embedding_field.as_str()) {
            check.errors.push(format!(
                "{label}: embedding field `{}` is not declared by the schema",
                source.embedding_field
            ));
        }
        check_budget(&mut check, &label, "topK", source.top_k);
    }

    for (i, source) in plan.structured_sources.iter().enumerate() {
        let label = format!("structuredSources[{i}]");
        if source.source.trim().is_empty() {
            check.errors.push(format!("{label}: empty source name"));
        }
        check_budget(&mut check, &label, "limit", source.limit);
        for (j, filter) in source.filters.iter().enumerate() {
            let flabel = format!("{label}.filters[{j}]");
            if filter.field.trim().is_empty() {
                check.errors.push(format!("{flabel}: empty field"));
            } else if !schema.is_filterable(&filter.field) {
                check.errors.push(format!(
                    "{flabel}: field `{}` is not filterable",
                    filter.field
                ));
            }
            if filter.value.is_null() {
                check.errors.push(format!("{flabel}: undefined value"));
            }
        }
    }

    if !(0.0..=1.0).contains(&plan.confidence) {
        check
            .errors
            .push(format!("confidence {} outside [0, 1]", plan.confidence));
    }
    if plan.max_refinement_cycles > MAX_REFINEMENT_CYCLES {
        check.errors.push(format!(
            "maxRefinementCycles {} outside [0, {MAX_REFINEMENT_CYCLES}]",
            plan.max_refinement_cycles
        ));
    }

    check
}

fn check_budget(check: &mut PlanCheck, label: &str, name: &str, value: u32) {
    if value == 0 || value > BUDGET_SANITY_CAP {
        check
            .errors
            .push(format!("{label}: {name} {value} outside [1, {MAX_TOP_K}]"));
    } else if value > MAX_TOP_K {
        check
            .warnings
            .push(format!("{label}: {name} {value} above {MAX_TOP_K}, will be capped"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_schema::default_tools_schema;
    use scout_types::{
        FilterPredicate, FusionMethod, PlanStrategy, QueryVectorSource, StructuredSource,
        VectorSource,
    };
    use serde_json::json;

    fn plan() -> QueryPlan {
        QueryPlan {
            strategy: PlanStrategy::Hybrid,
            vector_sources: vec![VectorSource {
                collection: "tools".to_string(),
                embedding_field: "semantic".to_string(),
                query_vector_source: QueryVectorSource::QueryText,
                top_k: 70,
                weight: None,
            }],
            structured_sources: vec![StructuredSource {
                source: "tools".to_string(),
                filters: vec![FilterPredicate::is_in(
                    "interface",
                    vec!["CLI".to_string()],
                )],
                limit: 100,
                weight: None,
            }],
            reranker: None,
            fusion: FusionMethod::WeightedSum,
            max_refinement_cycles: 0,
            explanation: String::new(),
            confidence: 0.8,
        }
    }

    #[test]
    fn valid_plan_passes() {
        let check = validate_plan(&plan(), &default_tools_schema());
        assert!(check.is_valid(), "errors: {:?}", check.errors);
        assert!(check.warnings.is_empty());
    }

    #[test]
    fn unknown_collection_is_an_error() {
        let mut p = plan();
        p.vector_sources[0].collection = "ghosts".to_string();
        let check = validate_plan(&p, &default_tools_schema());
        assert!(!check.is_valid());
        assert!(check.errors[0].contains("unknown collection"));
    }

    #[test]
    fn undeclared_embedding_field_is_an_error() {
        let mut p = plan();
        p.vector_sources[0].embedding_field = "hidden".to_string();
        let check = validate_plan(&p, &default_tools_schema());
        assert!(check.errors.iter().any(|e| e.contains("embedding field")));
    }

    #[test]
    fn budget_bounds_split_warning_and_error() {
        let mut p = plan();
        p.vector_sources[0].top_k = 0;
        assert!(!validate_plan(&p, &default_tools_schema()).is_valid());

        p.vector_sources[0].top_k = 500;
        let check = validate_plan(&p, &default_tools_schema());
        assert!(check.is_valid());
        assert!(check.warnings.iter().any(|w| w.contains("capped")));

        p.vector_sources[0].top_k = 5000;
        assert!(!validate_plan(&p, &default_tools_schema()).is_valid());
    }

    #[test]
    fn non_filterable_field_is_an_error() {
        let mut p = plan();
        p.structured_sources[0].filters[0].field = "secretField".to_string();
        let check = validate_plan(&p, &default_tools_schema());
        assert!(check.errors.iter().any(|e| e.contains("not filterable")));
    }

    #[test]
    fn null_filter_value_is_an_error() {
        let mut p = plan();
        p.structured_sources[0].filters[0].value = serde_json::Value::Null;
        let check = validate_plan(&p, &default_tools_schema());
        assert!(check.errors.iter().any(|e| e.contains("undefined value")));
    }

    #[test]
    fn confidence_out_of_bounds_is_an_error() {
        let mut p = plan();
        p.confidence = 1.2;
        assert!(!validate_plan(&p, &default_tools_schema()).is_valid());
    }

    #[test]
    fn filters_as_map_are_rejected_at_raw_level() {
        let raw = json!({
            "structuredSources": [{
                "source": "tools",
                "filters": {"interface": "CLI"},
                "limit": 100
            }]
        });
        let err = ensure_filter_sequences(&raw).unwrap_err();
        assert!(err.contains("not a map"));

        let ok = json!({
            "structuredSources": [{
                "source": "tools",
                "filters": [{"field": "interface", "operator": "in", "value": ["CLI"]}],
                "limit": 100
            }]
        });
        assert!(ensure_filter_sequences(&ok).is_ok());
    }
}
