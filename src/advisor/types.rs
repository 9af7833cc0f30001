//! Allocation proposal types shared by the cache, validator and orchestrator.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied request for an advisory run.
///
/// Bounds (non-empty names, positive budget, details length) are checked
/// by the caller before the core is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentInput {
    pub company_name: String,
    /// User-chosen investment category (free text).
    pub industry: String,
    pub budget: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// One line of an allocation proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationItem {
    pub category: String,
    pub percentage: f64,
    /// Always `round(budget * percentage / 100)`; never taken from model output.
    pub amount: u64,
    pub reasoning: String,
}

impl AllocationItem {
    pub fn new(category: String, percentage: f64, reasoning: String, budget: u64) -> Self {
        Self {
            category,
            percentage,
            amount: amount_for(budget, percentage),
            reasoning,
        }
    }
}

/// Monetary share of `budget` for `percentage`, rounded to the nearest unit.
pub fn amount_for(budget: u64, percentage: f64) -> u64 {
    let raw = (budget as f64 * percentage / 100.0).round();
    if raw <= 0.0 {
        0
    } else {
        raw as u64
    }
}

/// A validated allocation proposal for one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationProposal {
    pub allocations: Vec<AllocationItem>,
    pub total_budget: u64,
    pub summary: String,
    /// Only set for the AI-unguided pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_categories: Option<Vec<String>>,
}

impl AllocationProposal {
    /// Same proposal re-priced for a different budget.
    pub fn rebudgeted(&self, budget: u64) -> Self {
        Self {
            allocations: self
                .allocations
                .iter()
                .map(|item| AllocationItem {
                    amount: amount_for(budget, item.percentage),
                    ..item.clone()
                })
                .collect(),
            total_budget: budget,
            summary: self.summary.clone(),
            recommended_categories: self.recommended_categories.clone(),
        }
    }
}

/// Complete analysis: both patterns available. This is what gets cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub user_based: AllocationProposal,
    pub ai_based: AllocationProposal,
    pub generated_at: DateTime<Utc>,
}

/// The two independent proposal patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Sub-allocations within the user's chosen category.
    UserGuided,
    /// Categories chosen freely by the model.
    AiUnguided,
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserGuided => write!(f, "user-guided"),
            Self::AiUnguided => write!(f, "ai-unguided"),
        }
    }
}

/// Outcome of one pattern's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PatternOutcome {
    Available(AllocationProposal),
    Unavailable { reason: String },
}

impl PatternOutcome {
    pub fn proposal(&self) -> Option<&AllocationProposal> {
        match self {
            Self::Available(p) => Some(p),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// Result of one advisory request, possibly degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryOutcome {
    pub user_based: PatternOutcome,
    pub ai_based: PatternOutcome,
    pub generated_at: DateTime<Utc>,
    pub from_cache: bool,
}

impl AdvisoryOutcome {
    /// The full analysis, if both patterns succeeded.
    pub fn complete(&self) -> Option<AnalysisResult> {
        match (&self.user_based, &self.ai_based) {
            (PatternOutcome::Available(user), PatternOutcome::Available(ai)) => {
                Some(AnalysisResult {
                    user_based: user.clone(),
                    ai_based: ai.clone(),
                    generated_at: self.generated_at,
                })
            }
            _ => None,
        }
    }

    /// True when neither pattern produced a proposal.
    pub fn is_empty(&self) -> bool {
        !self.user_based.is_available() && !self.ai_based.is_available()
    }
}

/// Category -> percentage view of the unguided pattern, for summary display.
///
/// Recomputed on every call. Later duplicates of a category win.
pub fn simple_allocation(outcome: &AdvisoryOutcome) -> Option<HashMap<String, f64>> {
    outcome.ai_based.proposal().map(|proposal| {
        proposal
            .allocations
            .iter()
            .map(|a| (a.category.clone(), a.percentage))
            .collect()
    })
}
