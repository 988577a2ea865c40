//! Intent extraction: query → validated intent record.
//!
//! The LLM is a black box; only its post-conditions are relied upon. Output
//! is sanitized, parsed into the typed record and checked for vocabulary
//! closure before anything downstream sees it.

use std::sync::Arc;
use std::time::Instant;

use scout_schema::{DomainSchema, PromptGenerator, VocabularyAxis};
use scout_types::{IntentRecord, PipelineError, PipelineResult, Preference};

use crate::llm::LlmClient;

/// Default floor under which an extraction is rejected as unusable.
const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.3;

/// Extracts and validates intent records.
pub struct IntentExtractor {
    llm: Arc<dyn LlmClient>,
    schema: Arc<DomainSchema>,
    system_prompt: String,
    confidence_floor: f64,
}

impl IntentExtractor {
    /// Build an extractor; the system prompt is generated once from the schema.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, schema: Arc<DomainSchema>) -> Self {
        let system_prompt = PromptGenerator::new(&schema).intent_prompt();
        Self {
            llm,
            schema,
            system_prompt,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
        }
    }

    /// Override the confidence floor.
    #[must_use]
    pub fn with_confidence_floor(mut self, floor: f64) -> Self {
        self.confidence_floor = floor;
        self
    }

    /// Extract a validated intent record from a raw query.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ExtractionFailed`] when the model output is not
    /// parsable or confidence is below the floor;
    /// [`PipelineError::VocabularyMismatch`] when any vocabulary-bound field
    /// carries a value outside its vocabulary.
    pub async fn extract(&self, query: &str) -> PipelineResult<IntentRecord> {
        let started = Instant::now();
        let user_prompt = format!("Query: {query}");
        let mut raw = self
            .llm
            .invoke(&self.system_prompt, &user_prompt)
            .await
            .map_err(|e| {
                tracing::warn!(
                    event = "planner.intent.invoke_failed",
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "intent extraction call failed"
                );
                PipelineError::ExtractionFailed(e.to_string())
            })?;

        scrub_partial_objects(&mut raw);
        let mut intent: IntentRecord = serde_json::from_value(raw).map_err(|e| {
            tracing::warn!(
                event = "planner.intent.parse_failed",
                error = %e,
                "intent record parse failed"
            );
            PipelineError::ExtractionFailed(format!("unparsable intent record: {e}"))
        })?;

        sanitize(&mut intent);
        self.check_vocabulary(&intent)?;

        if intent.confidence < self.confidence_floor {
            return Err(PipelineError::ExtractionFailed(format!(
                "extraction confidence {:.2} below floor {:.2}",
                intent.confidence, self.confidence_floor
            )));
        }

        tracing::debug!(
            event = "planner.intent.extracted",
            elapsed_ms = started.elapsed().as_millis() as u64,
            goal = ?intent.primary_goal,
            confidence = intent.confidence,
            "intent extracted"
        );
        Ok(intent)
    }

    fn check_vocabulary(&self, intent: &IntentRecord) -> PipelineResult<()> {
        let bound: [(&str, &Preference, VocabularyAxis); 8] = [
            ("category", &intent.category, VocabularyAxis::Categories),
            ("interface", &intent.interface, VocabularyAxis::Interface),
            ("functionality", &intent.functionality, VocabularyAxis::Functionality),
            ("deployment", &intent.deployment, VocabularyAxis::Deployment),
            ("industry", &intent.industry, VocabularyAxis::Industries),
            ("userType", &intent.user_type, VocabularyAxis::UserTypes),
            ("pricingModel", &intent.pricing_model, VocabularyAxis::PricingModels),
            ("billingPeriod", &intent.billing_period, VocabularyAxis::BillingPeriods),
        ];
        for (field, preference, axis) in bound {
            for value in preference.values() {
                if !self.schema.vocabularies.contains(axis, value) {
                    return Err(PipelineError::VocabularyMismatch {
                        field: field.to_string(),
                        value: value.clone(),
                    });
                }
            }
        }
        let periods = [
            ("priceRange.billingPeriod", intent.price_range.as_ref().and_then(|r| r.billing_period.as_deref())),
            ("priceComparison.billingPeriod", intent.price_comparison.as_ref().and_then(|c| c.billing_period.as_deref())),
        ];
        for (field, period) in periods {
            if let Some(period) = period
                && !self
                    .schema
                    .vocabularies
                    .contains(VocabularyAxis::BillingPeriods, period)
            {
                return Err(PipelineError::VocabularyMismatch {
                    field: field.to_string(),
                    value: period.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Null out partially emitted price objects so they do not fail typed parse.
fn scrub_partial_objects(raw: &mut serde_json::Value) {
    let Some(map) = raw.as_object_mut() else { return };
    let incomplete = map.get("priceComparison").is_some_and(|cmp| {
        cmp.is_object() && (cmp.get("operator").is_none_or(serde_json::Value::is_null)
            || cmp.get("value").is_none_or(serde_json::Value::is_null))
    });
    if incomplete {
        map.insert("priceComparison".to_string(), serde_json::Value::Null);
    }
}

fn sanitize(intent: &mut IntentRecord) {
    intent.confidence = intent.confidence.clamp(0.0, 1.0);
    if let Some(cmp) = &mut intent.price_comparison {
        cmp.value = cmp.value.max(0.0);
    }
    if let Some(range) = &mut intent.price_range {
        range.min = range.min.map(|v| v.max(0.0));
        range.max = range.max.map(|v| v.max(0.0));
    }
    if let Some(tool) = &intent.reference_tool
        && tool.trim().is_empty()
    {
        intent.reference_tool = None;
    }
}
