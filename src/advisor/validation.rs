//! Extraction, schema validation and percentage repair for model output.
//!
//! Model output is untrusted: it is parsed into a `serde_json::Value` first
//! and every field is checked explicitly before anything typed is built.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use super::types::{AllocationItem, AllocationProposal};

/// Allowed absolute deviation of the percentage sum from 100.
const SUM_TOLERANCE: f64 = 1.0;

/// Characters of raw output echoed to the log on failure, from each end.
const LOG_SNIPPET_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no JSON payload found in response")]
    NoJsonPayload,

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("response is not an object")]
    NotAnObject,

    #[error("allocations array missing")]
    MissingAllocations,

    #[error("allocations array is empty")]
    EmptyAllocations,

    #[error("allocation at index {index} is not an object")]
    AllocationNotAnObject { index: usize },

    #[error("allocation at index {index} has invalid {field}: {reason}")]
    InvalidAllocation {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("summary is missing or empty")]
    InvalidSummary,

    #[error("recommendedCategories must be an array")]
    RecommendedCategoriesNotArray,

    #[error("invalid category at index {0} in recommendedCategories")]
    InvalidRecommendedCategory(usize),

    #[error(
        "cannot adjust percentages: adjustment would result in {adjusted}% \
         (max item: {max}%, adjustment: {adjustment}%)"
    )]
    IrreparableDrift {
        max: f64,
        adjustment: f64,
        adjusted: f64,
    },
}

/// One validated allocation line, before amounts are priced.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAllocation {
    pub category: String,
    pub percentage: f64,
    pub reasoning: String,
}

/// A validated, percentage-normalized proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProposal {
    pub allocations: Vec<ParsedAllocation>,
    pub summary: String,
    pub recommended_categories: Option<Vec<String>>,
}

impl ParsedProposal {
    /// Price every line against `budget`.
    pub fn into_proposal(self, budget: u64) -> AllocationProposal {
        AllocationProposal {
            allocations: self
                .allocations
                .into_iter()
                .map(|a| AllocationItem::new(a.category, a.percentage, a.reasoning, budget))
                .collect(),
            total_budget: budget,
            summary: self.summary,
            recommended_categories: self.recommended_categories,
        }
    }
}

fn tagged_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```json\s*(.*?)\s*```").expect("valid regex"))
}

fn any_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```\s*(.*?)\s*```").expect("valid regex"))
}

/// Candidate JSON texts, most specific first.
fn json_candidates(raw: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    if let Some(m) = tagged_fence().captures(raw).and_then(|c| c.get(1)) {
        candidates.push(m.as_str());
    }
    if let Some(m) = any_fence().captures(raw).and_then(|c| c.get(1)) {
        candidates.push(m.as_str());
    }
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        candidates.push(trimmed);
    }
    candidates
}

/// Parse the first candidate that is valid JSON.
pub fn extract_json(raw: &str) -> Result<Value, ValidationError> {
    let mut last_error = None;
    for candidate in json_candidates(raw) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e.to_string()),
        }
    }
    Err(last_error.map_or(ValidationError::NoJsonPayload, ValidationError::MalformedJson))
}

/// Extract, validate and normalize a proposal from raw model output.
pub fn parse_and_validate(raw: &str) -> Result<ParsedProposal, ValidationError> {
    let result = extract_json(raw).and_then(|value| validate_value(&value));
    if let Err(e) = &result {
        warn!(
            "Failed to parse AI response: {} (length: {}, head: {:?}, tail: {:?})",
            e,
            raw.len(),
            head(raw, LOG_SNIPPET_CHARS),
            tail(raw, LOG_SNIPPET_CHARS)
        );
    }
    result
}

/// Validate an already-parsed payload and repair percentage drift.
pub fn validate_value(value: &Value) -> Result<ParsedProposal, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::NotAnObject)?;

    let raw_allocations = object
        .get("allocations")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingAllocations)?;
    if raw_allocations.is_empty() {
        return Err(ValidationError::EmptyAllocations);
    }

    let mut allocations = raw_allocations
        .iter()
        .enumerate()
        .map(|(index, item)| validate_allocation(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    let summary = non_empty_str(object.get("summary"))
        .ok_or(ValidationError::InvalidSummary)?
        .to_string();

    let recommended_categories = validate_recommended(object)?;

    normalize_percentages(&mut allocations)?;

    Ok(ParsedProposal {
        allocations,
        summary,
        recommended_categories,
    })
}

fn validate_allocation(index: usize, item: &Value) -> Result<ParsedAllocation, ValidationError> {
    let fields = item
        .as_object()
        .ok_or(ValidationError::AllocationNotAnObject { index })?;
    let invalid = |field: &'static str, reason: String| ValidationError::InvalidAllocation {
        index,
        field,
        reason,
    };

    let category = non_empty_str(fields.get("category"))
        .ok_or_else(|| invalid("category", "must be non-empty string".into()))?;

    let percentage = finite_number(fields.get("percentage"))
        .ok_or_else(|| invalid("percentage", "must be a number".into()))?;
    if !(0.0..=100.0).contains(&percentage) {
        return Err(invalid(
            "percentage",
            format!("{}% is out of range (must be 0-100)", percentage),
        ));
    }

    // Checked for shape only; amounts are recomputed from the budget.
    let amount = finite_number(fields.get("amount"))
        .ok_or_else(|| invalid("amount", "must be a number".into()))?;
    if amount < 0.0 {
        return Err(invalid("amount", format!("{} is negative", amount)));
    }

    let reasoning = non_empty_str(fields.get("reasoning"))
        .ok_or_else(|| invalid("reasoning", "must be non-empty string".into()))?;

    Ok(ParsedAllocation {
        category: category.to_string(),
        percentage,
        reasoning: reasoning.to_string(),
    })
}

fn validate_recommended(object: &Map<String, Value>) -> Result<Option<Vec<String>>, ValidationError> {
    let items = match object.get("recommendedCategories") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::RecommendedCategoriesNotArray),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            non_empty_str(Some(item))
                .map(str::to_string)
                .ok_or(ValidationError::InvalidRecommendedCategory(index))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Make percentages sum to exactly 100 when they drift by more than the
/// tolerance, by moving the whole deficit onto the largest item.
pub fn normalize_percentages(allocations: &mut [ParsedAllocation]) -> Result<(), ValidationError> {
    let total: f64 = allocations.iter().map(|a| a.percentage).sum();
    if (total - 100.0).abs() <= SUM_TOLERANCE {
        return Ok(());
    }

    // First item wins ties.
    let Some(max_index) = (0..allocations.len()).reduce(|best, i| {
        if allocations[i].percentage > allocations[best].percentage {
            i
        } else {
            best
        }
    }) else {
        return Ok(());
    };

    let max_item = &mut allocations[max_index];
    let adjustment = 100.0 - total;
    let adjusted = max_item.percentage + adjustment;
    if !(0.0..=100.0).contains(&adjusted) {
        return Err(ValidationError::IrreparableDrift {
            max: max_item.percentage,
            adjustment,
            adjusted,
        });
    }

    warn!(
        "Total percentage is {}%, adjusted {} from {}% to {}%",
        total, max_item.category, max_item.percentage, adjusted
    );
    max_item.percentage = adjusted;
    Ok(())
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn finite_number(value: Option<&Value>) -> Option<f64> {
    value
        .filter(|v| v.is_number())
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
}

fn head(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn tail(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}
