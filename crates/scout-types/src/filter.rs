//! Typed filter predicates targeting the structured store.
//!
//! A filter is always carried as a sequence of `{field, operator, value}`
//! triples. The object-shaped filter representation that leaked out of LLM
//! output in the past is rejected at the plan validator.

use serde::{Deserialize, Serialize};

/// Closed set of filter operators supported by the structured store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Membership in an array of admissible values.
    #[serde(rename = "in")]
    In,
    /// Exact equality.
    #[serde(rename = "=")]
    Eq,
    /// Inequality.
    #[serde(rename = "!=")]
    Ne,
    /// Strictly less than.
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal.
    #[serde(rename = "<=")]
    Lte,
    /// Strictly greater than.
    #[serde(rename = ">")]
    Gt,
    /// Greater than or equal.
    #[serde(rename = ">=")]
    Gte,
    /// Matches an array element satisfying a compound inner condition.
    #[serde(rename = "elemMatch")]
    ElemMatch,
}

impl FilterOperator {
    /// Wire literal for this operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::ElemMatch => "elemMatch",
        }
    }
}

/// One typed filter predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Target field in the structured store (must be filterable per schema).
    pub field: String,
    /// Operator from the closed set.
    pub operator: FilterOperator,
    /// Operand; for `elemMatch` a nested map of inner conditions.
    pub value: serde_json::Value,
}

impl FilterPredicate {
    /// Build a predicate.
    #[must_use]
    pub fn new(field: &str, operator: FilterOperator, value: serde_json::Value) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value,
        }
    }

    /// Membership predicate over an array of values.
    #[must_use]
    pub fn is_in(field: &str, values: Vec<String>) -> Self {
        Self::new(field, FilterOperator::In, serde_json::json!(values))
    }

    /// `elemMatch` predicate with a nested condition map.
    #[must_use]
    pub fn elem_match(field: &str, conditions: serde_json::Value) -> Self {
        Self::new(field, FilterOperator::ElemMatch, conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operators_use_wire_literals() {
        assert_eq!(serde_json::to_string(&FilterOperator::In).unwrap(), "\"in\"");
        assert_eq!(serde_json::to_string(&FilterOperator::Gte).unwrap(), "\">=\"");
        assert_eq!(
            serde_json::to_string(&FilterOperator::ElemMatch).unwrap(),
            "\"elemMatch\""
        );
    }

    #[test]
    fn predicate_round_trips() {
        let pred = FilterPredicate::is_in("interface", vec!["CLI".to_string()]);
        let json = serde_json::to_value(&pred).unwrap();
        assert_eq!(
            json,
            json!({"field": "interface", "operator": "in", "value": ["CLI"]})
        );
        let back: FilterPredicate = serde_json::from_value(json).unwrap();
        assert_eq!(back, pred);
    }
}
