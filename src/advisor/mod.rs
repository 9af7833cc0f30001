//! Advisor module - turns an (industry, budget) request into validated
//! allocation proposals.
//!
//! # Patterns
//! - **User-guided**: sub-allocations within the user's chosen category
//! - **AI-unguided**: categories chosen freely by the model
//!
//! Each pattern fails independently; a failed pattern is reported as
//! unavailable instead of failing the request.

mod orchestrator;
pub mod prompts;
mod types;
pub mod validation;

pub use orchestrator::{AdvisoryError, AdvisoryOrchestrator};
pub use types::{
    amount_for, simple_allocation, AdvisoryOutcome, AllocationItem, AllocationProposal,
    AnalysisResult, InvestmentInput, Pattern, PatternOutcome,
};
pub use validation::{parse_and_validate, ParsedAllocation, ParsedProposal, ValidationError};
