//! Full pipeline tests: query in, ranked candidates out, against scripted
//! collaborators.

use std::sync::Arc;

use serde_json::json;

use scout_schema::default_tools_schema;
use scout_search::test_support::{
    FailingLlm, HashEmbedder, InMemoryStructuredStore, InMemoryVectorStore, StaticLlm,
};
use scout_search::{PipelineConfig, SearchOptions, SearchPipeline};
use scout_types::{CandidateSource, ErrorKind, PlanStrategy};

const DIM: usize = 8;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn intent_response() -> serde_json::Value {
    json!({
        "primaryGoal": "find",
        "pricingModel": "Free",
        "interface": "CLI",
        "confidence": 0.9
    })
}

fn plan_response() -> serde_json::Value {
    json!({
        "strategy": "hybrid",
        "vectorSources": [{"collection": "tools", "topK": 10}],
        "structuredSources": [],
        "fusion": "weighted_sum",
        "maxRefinementCycles": 0,
        "explanation": "identity search",
        "confidence": 0.8
    })
}

fn stores(query: &str) -> (HashEmbedder, InMemoryVectorStore, InMemoryStructuredStore) {
    let embedder = HashEmbedder::new(DIM);
    let aligned = embedder.vector_for(query);
    let vector = InMemoryVectorStore::new()
        .with_document("tools", "helix", aligned.clone(), json!({"name": "Helix"}))
        .with_document("tools", "warp", aligned.clone(), json!({"name": "Warp"}))
        .with_document("functionality", "helix", aligned, json!({"name": "Helix"}));
    let structured = InMemoryStructuredStore::new()
        .with_document(
            "helix",
            json!({"pricingModel": "Free", "interface": ["CLI"], "name": "Helix"}),
        )
        .with_document(
            "warp",
            json!({"pricingModel": "Subscription", "interface": ["CLI"], "name": "Warp"}),
        );
    (embedder, vector, structured)
}

fn pipeline(
    llm: Arc<dyn scout_planner::LlmClient>,
    embedder: HashEmbedder,
    vector: InMemoryVectorStore,
    structured: InMemoryStructuredStore,
    config: PipelineConfig,
) -> SearchPipeline {
    SearchPipeline::new(
        default_tools_schema(),
        llm,
        Arc::new(embedder),
        Arc::new(vector),
        Arc::new(structured),
        config,
    )
    .unwrap()
}

#[tokio::test]
async fn free_cli_tools_end_to_end() {
    init_tracing();
    let query = "free cli tools";
    let (embedder, vector, structured) = stores(query);
    let llm = Arc::new(StaticLlm::new(vec![intent_response(), plan_response()]));
    let pipeline = pipeline(llm, embedder, vector, structured, PipelineConfig::default());

    let response = pipeline
        .search(query, SearchOptions { debug: true, ..SearchOptions::default() })
        .await;

    assert!(response.errors.iter().all(|e| e.recovered));
    let plan = response.plan.as_ref().unwrap();
    assert_eq!(plan.strategy, PlanStrategy::Hybrid);
    // The structured filter kept only the Free tool; helix is corroborated
    // by vector and structured paths.
    let helix = response.candidates.iter().find(|c| c.id == "helix").unwrap();
    assert_eq!(helix.source, CandidateSource::Fusion);
    assert!(!helix.provenance.filters_applied.is_empty());
    assert!(!helix.provenance.collections.is_empty());
    // Dedup invariant.
    let mut ids: Vec<&str> = response.candidates.iter().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), response.candidates.len());
    // Stats carry every source.
    assert!(response.stats.sources.len() >= 2);
    assert!(!response.stats.cache_hit);
    assert!(response.intent.is_some());
}

#[tokio::test]
async fn extraction_failure_returns_zero_candidates_with_error() {
    let (embedder, vector, structured) = stores("q");
    let pipeline = pipeline(
        Arc::new(FailingLlm),
        embedder,
        vector,
        structured,
        PipelineConfig::default(),
    );

    let response = pipeline.search("anything", SearchOptions::default()).await;
    assert!(response.candidates.is_empty());
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].kind, ErrorKind::ExtractionFailed);
    assert_eq!(response.errors[0].node, "intent-extractor");
    assert!(!response.errors[0].recovered);
}

#[tokio::test]
async fn vocabulary_mismatch_is_fatal_and_named() {
    let (embedder, vector, structured) = stores("q");
    let llm = Arc::new(StaticLlm::new(vec![json!({
        "primaryGoal": "find",
        "interface": "terminal-ui",
        "confidence": 0.9
    })]));
    let pipeline = pipeline(llm, embedder, vector, structured, PipelineConfig::default());

    let response = pipeline.search("terminal tools", SearchOptions::default()).await;
    assert!(response.candidates.is_empty());
    assert_eq!(response.errors[0].kind, ErrorKind::VocabularyMismatch);
    assert!(response.errors[0].message.contains("interface"));
    assert!(response.errors[0].message.contains("terminal-ui"));
}

#[tokio::test]
async fn empty_query_is_rejected_before_any_model_call() {
    let (embedder, vector, structured) = stores("q");
    // A failing LLM proves no model call happens.
    let pipeline = pipeline(
        Arc::new(FailingLlm),
        embedder,
        vector,
        structured,
        PipelineConfig::default(),
    );
    let response = pipeline.search("   ", SearchOptions::default()).await;
    assert_eq!(response.errors[0].node, "request-validation");
}

#[tokio::test]
async fn failing_vector_collection_degrades_gracefully() {
    let query = "free cli tools";
    let (embedder, vector, structured) = stores(query);
    let vector = vector.with_failing_collection("functionality");
    let llm = Arc::new(StaticLlm::new(vec![intent_response(), plan_response()]));
    let pipeline = pipeline(llm, embedder, vector, structured, PipelineConfig::default());

    let response = pipeline.search(query, SearchOptions::default()).await;
    assert!(!response.candidates.is_empty());
    assert!(
        response
            .errors
            .iter()
            .any(|e| e.kind == ErrorKind::SourceUnavailable && e.recovered)
    );
}

#[tokio::test]
async fn cache_serves_second_request_without_collaborators() {
    let query = "free cli tools";
    let (embedder, vector, structured) = stores(query);
    // Script exactly one intent + one plan: a second model round would fail
    // the test by exhausting nothing (StaticLlm repeats its last entry), so
    // assert via cache stats instead.
    let llm = Arc::new(StaticLlm::new(vec![intent_response(), plan_response()]));
    let config = PipelineConfig {
        enable_cache: true,
        cache_ttl_seconds: 300,
        ..PipelineConfig::default()
    };
    let pipeline = pipeline(llm, embedder, vector, structured, config);

    let first = pipeline.search(query, SearchOptions::default()).await;
    assert!(!first.stats.cache_hit);
    let second = pipeline.search(query, SearchOptions::default()).await;
    assert!(second.stats.cache_hit);
    assert_eq!(second.stats.fusion_applied, first.stats.fusion_applied);
    assert_eq!(
        first.candidates.iter().map(|c| &c.id).collect::<Vec<_>>(),
        second.candidates.iter().map(|c| &c.id).collect::<Vec<_>>()
    );
    let stats = pipeline.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn debug_flag_gates_plan_and_intent() {
    let query = "free cli tools";
    let (embedder, vector, structured) = stores(query);
    let llm = Arc::new(StaticLlm::new(vec![intent_response(), plan_response()]));
    let pipeline = pipeline(llm, embedder, vector, structured, PipelineConfig::default());

    let response = pipeline.search(query, SearchOptions::default()).await;
    assert!(response.plan.is_none());
    assert!(response.intent.is_none());
}

#[tokio::test]
async fn responses_are_deterministic_across_runs() {
    let query = "free cli tools";
    let run = || async {
        let (embedder, vector, structured) = stores(query);
        let llm = Arc::new(StaticLlm::new(vec![intent_response(), plan_response()]));
        let pipeline = pipeline(llm, embedder, vector, structured, PipelineConfig::default());
        pipeline.search(query, SearchOptions::default()).await
    };
    let first = run().await;
    let second = run().await;
    assert_eq!(
        serde_json::to_value(&first.candidates).unwrap(),
        serde_json::to_value(&second.candidates).unwrap()
    );
}
