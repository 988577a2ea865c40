//! End-to-end planning scenarios against a scripted LLM.
//!
//! Each scenario fixes an intent record and checks the exact predicates and
//! sources of the emitted plan.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use scout_planner::{LlmClient, LlmError, QueryPlanner};
use scout_schema::default_tools_schema;
use scout_types::{
    ComparisonMode, FilterOperator, FusionMethod, IntentRecord, PlanStrategy, Preference,
    PriceComparison, PriceOperator, PriceRange, PrimaryGoal, QueryVectorSource,
};

/// Replays a fixed sequence of responses; repeats the last one when drained.
struct ScriptedLlm {
    responses: Vec<serde_json::Value>,
    cursor: AtomicUsize,
}

impl ScriptedLlm {
    fn new(responses: Vec<serde_json::Value>) -> Arc<Self> {
        Arc::new(Self {
            responses,
            cursor: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn invoke(&self, _system: &str, _user: &str) -> Result<serde_json::Value, LlmError> {
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .responses
            .get(i.min(self.responses.len() - 1))
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }
}

fn planner_with(plan_response: serde_json::Value) -> QueryPlanner {
    QueryPlanner::new(
        ScriptedLlm::new(vec![plan_response]),
        Arc::new(default_tools_schema()),
    )
}

fn model_plan_on_tools() -> serde_json::Value {
    json!({
        "strategy": "hybrid",
        "vectorSources": [{"collection": "tools", "topK": 70}],
        "structuredSources": [],
        "fusion": "rrf",
        "maxRefinementCycles": 0,
        "explanation": "model explanation",
        "confidence": 0.8
    })
}

#[tokio::test]
async fn s1_free_cli_tools() {
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.pricing_model = Preference::from("Free");
    intent.interface = Preference::from("CLI");
    intent.confidence = 0.9;

    let planned = planner_with(model_plan_on_tools())
        .plan("free cli tools", &intent)
        .await
        .unwrap();
    let plan = &planned.plan;

    assert!(plan.vector_sources.iter().any(|s| s.collection == "tools"));
    assert_eq!(plan.structured_sources.len(), 1);
    let filters = &plan.structured_sources[0].filters;
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[0].field, "interface");
    assert_eq!(filters[0].operator, FilterOperator::In);
    assert_eq!(filters[0].value, json!(["CLI"]));
    assert_eq!(filters[1].field, "pricingModel");
    assert_eq!(filters[1].value, json!(["Free"]));
}

#[tokio::test]
async fn s2_tools_under_fifty_per_month() {
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.price_comparison = Some(PriceComparison {
        operator: PriceOperator::LessThan,
        value: 50.0,
        currency: None,
        billing_period: Some("Monthly".to_string()),
    });
    intent.confidence = 0.85;

    let planned = planner_with(model_plan_on_tools())
        .plan("AI tools under $50 per month", &intent)
        .await
        .unwrap();
    let filters = &planned.plan.structured_sources[0].filters;
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].field, "pricing");
    assert_eq!(filters[0].operator, FilterOperator::ElemMatch);
    assert_eq!(
        filters[0].value,
        json!({"billingPeriod": "Monthly", "price": {"<": 50.0}})
    );
}

#[tokio::test]
async fn s3_code_editor_in_price_range() {
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.category = Preference::from("Code Editor");
    intent.price_range = Some(PriceRange {
        min: Some(20.0),
        max: Some(100.0),
        currency: None,
        billing_period: Some("Monthly".to_string()),
    });
    intent.confidence = 0.9;

    let planned = planner_with(model_plan_on_tools())
        .plan("code editor between $20-100 monthly", &intent)
        .await
        .unwrap();
    let filters = &planned.plan.structured_sources[0].filters;
    assert_eq!(filters[0].field, "pricing");
    assert_eq!(
        filters[0].value,
        json!({"billingPeriod": "Monthly", "price": {">=": 20.0, "<=": 100.0}})
    );
    assert_eq!(filters[1].field, "categories.primary");
    assert_eq!(filters[1].value, json!(["Code Editor"]));
}

#[tokio::test]
async fn s4_cursor_alternative_but_cheaper() {
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.reference_tool = Some("Cursor IDE".to_string());
    intent.comparison_mode = Some(ComparisonMode::AlternativeTo);
    intent.category = Preference::from("Code Editor");
    intent.price_comparison = Some(PriceComparison {
        operator: PriceOperator::LessThan,
        value: 20.0,
        currency: None,
        billing_period: Some("Monthly".to_string()),
    });
    intent.confidence = 0.9;

    let planned = planner_with(model_plan_on_tools())
        .plan("Cursor alternative but cheaper", &intent)
        .await
        .unwrap();
    let plan = &planned.plan;
    assert_eq!(plan.strategy, PlanStrategy::Hybrid);
    assert!(
        plan.vector_sources
            .iter()
            .any(|s| s.query_vector_source == QueryVectorSource::ReferenceToolEmbedding)
    );
}

#[tokio::test]
async fn s5_around_thirty_per_month() {
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.price_comparison = Some(PriceComparison {
        operator: PriceOperator::Around,
        value: 30.0,
        currency: None,
        billing_period: Some("Monthly".to_string()),
    });
    intent.confidence = 0.8;

    let planned = planner_with(model_plan_on_tools())
        .plan("tools around $30 per month", &intent)
        .await
        .unwrap();
    let filters = &planned.plan.structured_sources[0].filters;
    assert_eq!(
        filters[0].value,
        json!({"billingPeriod": "Monthly", "price": {">=": 27, "<=": 33}})
    );
}

#[tokio::test]
async fn s6_free_offline_code_generator() {
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.pricing_model = Preference::from("Free");
    intent.functionality = Preference::from("Code Generation");
    intent.deployment = Preference::from("Self-Hosted");
    intent.confidence = 0.9;

    let planned = planner_with(model_plan_on_tools())
        .plan("free offline AI code generator", &intent)
        .await
        .unwrap();
    let plan = &planned.plan;
    let fields: Vec<&str> = plan.structured_sources[0]
        .filters
        .iter()
        .map(|f| f.field.as_str())
        .collect();
    assert_eq!(fields, ["deployment", "functionality", "pricingModel"]);
    assert!(
        plan.vector_sources
            .iter()
            .any(|s| s.collection == "functionality")
    );
}

#[tokio::test]
async fn planner_injects_missing_recommended_collections() {
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.confidence = 0.9;

    // Model proposes nothing usable.
    let planned = planner_with(json!({"confidence": 0.6}))
        .plan("anything", &intent)
        .await
        .unwrap();
    let plan = &planned.plan;
    let tools = plan
        .vector_sources
        .iter()
        .find(|s| s.collection == "tools")
        .unwrap();
    assert_eq!(tools.top_k, 70);
    assert_eq!(tools.embedding_field, "semantic");
    let functionality = plan
        .vector_sources
        .iter()
        .find(|s| s.collection == "functionality")
        .unwrap();
    assert_eq!(functionality.top_k, 40);
    assert_eq!(functionality.embedding_field, "entities.functionality");
}

#[tokio::test]
async fn planner_drops_unknown_and_disabled_collections() {
    let mut schema = default_tools_schema();
    schema
        .vector_collections
        .iter_mut()
        .find(|c| c.name == "usecases")
        .unwrap()
        .enabled = false;

    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.confidence = 0.9;

    let planner = QueryPlanner::new(
        ScriptedLlm::new(vec![json!({
            "strategy": "multi-vector",
            "vectorSources": [
                {"collection": "tools", "topK": 50},
                {"collection": "usecases", "topK": 50},
                {"collection": "made-up", "topK": 50}
            ],
            "confidence": 0.7
        })]),
        Arc::new(schema),
    );
    let planned = planner.plan("anything", &intent).await.unwrap();
    let collections: Vec<&str> = planned
        .plan
        .vector_sources
        .iter()
        .map(|s| s.collection.as_str())
        .collect();
    assert!(!collections.contains(&"usecases"));
    assert!(!collections.contains(&"made-up"));
    assert!(planned.warnings.iter().any(|w| w.contains("made-up")));
}

#[tokio::test]
async fn fusion_follows_source_count() {
    // Two vector sources -> weighted_sum (identity-focused default tiers).
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.confidence = 0.9;
    let planned = planner_with(json!({"confidence": 0.5}))
        .plan("q", &intent)
        .await
        .unwrap();
    assert_eq!(planned.plan.vector_sources.len(), 2);
    assert_eq!(planned.plan.fusion, FusionMethod::WeightedSum);

    // Three or more -> rrf.
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Explore);
    intent.confidence = 0.9;
    let planned = planner_with(json!({"confidence": 0.5}))
        .plan("q", &intent)
        .await
        .unwrap();
    assert!(planned.plan.vector_sources.len() > 2);
    assert_eq!(planned.plan.fusion, FusionMethod::Rrf);
    assert_eq!(planned.plan.strategy, PlanStrategy::MultiVector);
}

#[tokio::test]
async fn filters_as_map_fail_the_plan() {
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.confidence = 0.9;
    let err = planner_with(json!({
        "strategy": "hybrid",
        "structuredSources": [{"source": "tools", "filters": {"interface": "CLI"}, "limit": 100}],
        "confidence": 0.8
    }))
    .plan("q", &intent)
    .await
    .unwrap_err();
    assert!(err.to_string().contains("not a map"));
}

#[tokio::test]
async fn planning_is_idempotent_with_a_deterministic_model() {
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.pricing_model = Preference::from("Free");
    intent.confidence = 0.9;

    let first = planner_with(model_plan_on_tools())
        .plan("free tools", &intent)
        .await
        .unwrap();
    let second = planner_with(model_plan_on_tools())
        .plan("free tools", &intent)
        .await
        .unwrap();
    assert_eq!(first.plan, second.plan);
}

#[tokio::test]
async fn budgets_and_confidence_stay_in_bounds() {
    let mut intent = IntentRecord::with_goal(PrimaryGoal::Find);
    intent.confidence = 0.9;
    let planned = planner_with(json!({
        "strategy": "hybrid",
        "vectorSources": [{"collection": "tools", "topK": 9999}],
        "confidence": 42.0
    }))
    .plan("q", &intent)
    .await
    .unwrap();
    for source in &planned.plan.vector_sources {
        assert!((1..=200).contains(&source.top_k));
    }
    assert!((0.0..=1.0).contains(&planned.plan.confidence));
}
