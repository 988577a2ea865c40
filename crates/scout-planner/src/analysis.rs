//! Deterministic intent analysis: recommended strategy and collection tiers.
//!
//! First matching rule wins; the order of the rules is part of the contract.

use scout_types::{IntentRecord, PlanStrategy, PrimaryGoal};

/// Analysis-level retrieval strategy labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStrategy {
    /// A specific tool or a class of tools is being sought.
    IdentityFocused,
    /// The query is about what tools can do.
    CapabilityFocused,
    /// The query describes a scenario or problem.
    UsecaseFocused,
    /// The query is about platform or deployment.
    TechnicalFocused,
    /// Many features/constraints; spread across collections.
    MultiCollectionHybrid,
    /// Default spread.
    AdaptiveWeighted,
}

impl AnalysisStrategy {
    /// Stable label used in explanations and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdentityFocused => "identity-focused",
            Self::CapabilityFocused => "capability-focused",
            Self::UsecaseFocused => "usecase-focused",
            Self::TechnicalFocused => "technical-focused",
            Self::MultiCollectionHybrid => "multi-collection-hybrid",
            Self::AdaptiveWeighted => "adaptive-weighted",
        }
    }
}

/// Outcome of the deterministic analysis step.
#[derive(Debug, Clone)]
pub struct IntentAnalysis {
    /// Recommended strategy label.
    pub strategy: AnalysisStrategy,
    /// Collections that should carry full weight.
    pub primary: Vec<String>,
    /// Supportive collections at reduced weight.
    pub secondary: Vec<String>,
}

impl IntentAnalysis {
    /// Plan-level strategy this analysis implies; used for the confidence
    /// match boost.
    #[must_use]
    pub fn implied_plan_strategy(&self) -> PlanStrategy {
        match self.strategy {
            AnalysisStrategy::MultiCollectionHybrid => PlanStrategy::MultiVector,
            _ => PlanStrategy::Hybrid,
        }
    }

    /// Recommended weight for a collection: 1.0 primary, 0.6 secondary,
    /// 0.4 for anything else the plan adds.
    #[must_use]
    pub fn weight_for(&self, collection: &str) -> f64 {
        if self.primary.iter().any(|c| c == collection) {
            1.0
        } else if self.secondary.iter().any(|c| c == collection) {
            0.6
        } else {
            0.4
        }
    }
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Derive the recommended strategy and collection tiers from an intent.
#[must_use]
pub fn analyze_intent(intent: &IntentRecord) -> IntentAnalysis {
    let features = intent.functionality.len();
    let constraints = intent.constraints.len();

    if intent.reference_tool.is_some() || intent.primary_goal == PrimaryGoal::Find {
        return IntentAnalysis {
            strategy: AnalysisStrategy::IdentityFocused,
            primary: names(&["tools"]),
            secondary: names(&["functionality"]),
        };
    }
    if features > 0 || intent.primary_goal == PrimaryGoal::Recommend {
        return IntentAnalysis {
            strategy: AnalysisStrategy::CapabilityFocused,
            primary: names(&["functionality"]),
            secondary: names(&["tools", "usecases"]),
        };
    }
    if intent.primary_goal == PrimaryGoal::Explore {
        return IntentAnalysis {
            strategy: AnalysisStrategy::UsecaseFocused,
            primary: names(&["usecases"]),
            secondary: names(&["functionality", "tools"]),
        };
    }
    if !intent.interface.is_empty()
        || !intent.deployment.is_empty()
        || intent.primary_goal == PrimaryGoal::Analyze
    {
        return IntentAnalysis {
            strategy: AnalysisStrategy::TechnicalFocused,
            primary: names(&["interface"]),
            secondary: names(&["tools", "functionality"]),
        };
    }
    if features >= 3 || constraints >= 3 || (features > 0 && constraints > 0) {
        return IntentAnalysis {
            strategy: AnalysisStrategy::MultiCollectionHybrid,
            primary: names(&["tools", "functionality"]),
            secondary: names(&["usecases", "interface"]),
        };
    }
    IntentAnalysis {
        strategy: AnalysisStrategy::AdaptiveWeighted,
        primary: names(&["tools", "functionality"]),
        secondary: Vec::new(),
    }
}
