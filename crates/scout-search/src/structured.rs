//! Structured store client and predicate encoding.
//!
//! Typed predicate sequences are encoded into a Mongo-style query document
//! (`$in`, `$gte`, `$elemMatch`, ...). Two predicates on the same field are
//! combined under `$and` rather than silently overwriting each other.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use scout_types::{FilterOperator, FilterPredicate};

use crate::SourceError;

/// One raw document from the structured store.
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredHit {
    /// Document identifier.
    pub id: String,
    /// Stored payload.
    #[serde(default)]
    pub payload: Value,
}

/// Seam for the structured store.
#[async_trait]
pub trait StructuredStore: Send + Sync {
    /// Query one collection with a predicate sequence.
    async fn query(
        &self,
        collection: &str,
        filters: &[FilterPredicate],
        limit: u32,
    ) -> Result<Vec<StructuredHit>, SourceError>;
}

/// Encode a predicate sequence as a Mongo-style query document.
#[must_use]
pub fn predicates_to_document(filters: &[FilterPredicate]) -> Value {
    let clauses: Vec<Value> = filters.iter().map(predicate_to_clause).collect();
    match clauses.len() {
        0 => json!({}),
        1 => clauses.into_iter().next().unwrap_or_else(|| json!({})),
        _ => json!({"$and": clauses}),
    }
}

fn predicate_to_clause(filter: &FilterPredicate) -> Value {
    let condition = match filter.operator {
        FilterOperator::In => json!({"$in": filter.value}),
        FilterOperator::Eq => filter.value.clone(),
        FilterOperator::Ne => json!({"$ne": filter.value}),
        FilterOperator::Lt => json!({"$lt": filter.value}),
        FilterOperator::Lte => json!({"$lte": filter.value}),
        FilterOperator::Gt => json!({"$gt": filter.value}),
        FilterOperator::Gte => json!({"$gte": filter.value}),
        FilterOperator::ElemMatch => json!({"$elemMatch": elem_match_conditions(&filter.value)}),
    };
    let mut clause = Map::new();
    clause.insert(filter.field.clone(), condition);
    Value::Object(clause)
}

/// Rewrite operator-literal keys (`<`, `>=`, ...) inside an `elemMatch`
/// condition map into their `$`-prefixed forms.
fn elem_match_conditions(conditions: &Value) -> Value {
    let Some(map) = conditions.as_object() else {
        return conditions.clone();
    };
    let mut out = Map::new();
    for (key, value) in map {
        let rewritten = match value {
            Value::Object(inner) => {
                let mut ops = Map::new();
                for (op, operand) in inner {
                    let mongo_op = match op.as_str() {
                        "<" => "$lt",
                        "<=" => "$lte",
                        ">" => "$gt",
                        ">=" => "$gte",
                        "!=" => "$ne",
                        other => other,
                    };
                    ops.insert(mongo_op.to_string(), operand.clone());
                }
                Value::Object(ops)
            }
            other => other.clone(),
        };
        out.insert(key.clone(), rewritten);
    }
    Value::Object(out)
}

/// HTTP client against a document-query API.
pub struct HttpStructuredStore {
    client: Client,
    base_url: String,
}

impl HttpStructuredStore {
    /// Build a client; `base_url` hosts `/query`.
    #[must_use]
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct QueryResponseBody {
    #[serde(default)]
    documents: Vec<StructuredHit>,
}

#[async_trait]
impl StructuredStore for HttpStructuredStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[FilterPredicate],
        limit: u32,
    ) -> Result<Vec<StructuredHit>, SourceError> {
        let started = Instant::now();
        let url = format!("{}/query", self.base_url);
        let body = json!({
            "collection": collection,
            "filter": predicates_to_document(filters),
            "limit": limit,
        });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                tracing::debug!(
                    event = "search.structured.request_failed",
                    collection,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "structured query request failed"
                );
                SourceError::new(error)
            })?;
        if !resp.status().is_success() {
            return Err(SourceError::new(format!(
                "structured store returned {} for `{collection}`",
                resp.status()
            )));
        }
        let data: QueryResponseBody = resp.json().await.map_err(SourceError::new)?;
        tracing::debug!(
            event = "search.structured.completed",
            collection,
            elapsed_ms = started.elapsed().as_millis() as u64,
            hits = data.documents.len(),
            "structured query completed"
        );
        Ok(data.documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_predicate_becomes_dollar_in() {
        let doc = predicates_to_document(&[FilterPredicate::is_in(
            "interface",
            vec!["CLI".to_string()],
        )]);
        assert_eq!(doc, json!({"interface": {"$in": ["CLI"]}}));
    }

    #[test]
    fn elem_match_rewrites_operator_literals() {
        let doc = predicates_to_document(&[FilterPredicate::elem_match(
            "pricing",
            json!({"billingPeriod": "Monthly", "price": {">=": 27, "<=": 33}}),
        )]);
        assert_eq!(
            doc,
            json!({"pricing": {"$elemMatch": {
                "billingPeriod": "Monthly",
                "price": {"$gte": 27, "$lte": 33}
            }}})
        );
    }

    #[test]
    fn duplicate_fields_are_combined_under_and() {
        let doc = predicates_to_document(&[
            FilterPredicate::elem_match("pricing", json!({"price": {">=": 5.0}})),
            FilterPredicate::elem_match("pricing", json!({"price": {"<": 40.0}})),
        ]);
        assert_eq!(
            doc,
            json!({"$and": [
                {"pricing": {"$elemMatch": {"price": {"$gte": 5.0}}}},
                {"pricing": {"$elemMatch": {"price": {"$lt": 40.0}}}}
            ]})
        );
    }

    #[test]
    fn scalar_equality_passes_through() {
        let doc = predicates_to_document(&[FilterPredicate::new(
            "deployment",
            FilterOperator::Eq,
            json!("Cloud"),
        )]);
        assert_eq!(doc, json!({"deployment": "Cloud"}));
    }

    #[test]
    fn empty_sequence_matches_everything() {
        assert_eq!(predicates_to_document(&[]), json!({}));
    }
}
