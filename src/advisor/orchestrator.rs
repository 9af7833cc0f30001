//! Advisory orchestrator - cache lookup, generation and validation per pattern.
//!
//! # Flow
//! ```text
//! 1. Normalize (industry, budget) into a cache key
//! 2. Hit: re-price the cached proposals for this budget, done
//! 3. Miss: run both patterns concurrently (generate -> validate)
//! 4. Both succeeded: store the result in the cache
//! 5. Return per-pattern outcomes; failures become `Unavailable`
//! ```

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::prompts::{build_ai_based_prompt, build_user_based_prompt};
use super::types::{AdvisoryOutcome, AllocationProposal, InvestmentInput, Pattern, PatternOutcome};
use super::validation::{parse_and_validate, ValidationError};
use crate::cache::{self, AnalysisCache};
use crate::llm::{GenerationConfig, GenerationRequest, LlmError, LlmErrorKind, TextGenerator};

/// Why a single pattern produced no proposal.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("invalid AI response: {0}")]
    Validation(#[from] ValidationError),
}

impl AdvisoryError {
    /// Fixed, client-safe description. The full cause is only logged.
    pub fn public_reason(&self) -> &'static str {
        match self {
            Self::Generation(e) => match e.kind() {
                LlmErrorKind::Configuration => "AI analysis is not configured",
                LlmErrorKind::Network
                | LlmErrorKind::RateLimit
                | LlmErrorKind::Server
                | LlmErrorKind::Exhausted => "AI service is temporarily unavailable",
                LlmErrorKind::Client | LlmErrorKind::EmptyResponse | LlmErrorKind::Decode => {
                    "AI service returned an unusable response"
                }
            },
            Self::Validation(_) => "AI response failed validation",
        }
    }
}

/// Composes the cache, the generation client and the validator.
///
/// # Invariants
/// - `advise()` never fails; pattern failures are reported as `Unavailable`
/// - Only complete results (both patterns available) are cached
pub struct AdvisoryOrchestrator {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<AnalysisCache>,
    generation: GenerationConfig,
}

impl AdvisoryOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, cache: Arc<AnalysisCache>) -> Self {
        Self {
            generator,
            cache,
            generation: GenerationConfig::default(),
        }
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Produce allocation proposals for `input`.
    pub async fn advise(&self, input: &InvestmentInput) -> AdvisoryOutcome {
        let span = tracing::info_span!(
            "advisory",
            request_id = %Uuid::new_v4(),
            industry = %input.industry,
            budget = input.budget,
        );
        self.advise_inner(input).instrument(span).await
    }

    async fn advise_inner(&self, input: &InvestmentInput) -> AdvisoryOutcome {
        let key = cache::normalize(&input.industry, input.budget);

        if let Some(cached) = self.cache.get(&key) {
            return AdvisoryOutcome {
                user_based: PatternOutcome::Available(cached.user_based.rebudgeted(input.budget)),
                ai_based: PatternOutcome::Available(cached.ai_based.rebudgeted(input.budget)),
                generated_at: cached.generated_at,
                from_cache: true,
            };
        }

        let (user_based, ai_based) = futures::future::join(
            self.run_pattern(Pattern::UserGuided, input),
            self.run_pattern(Pattern::AiUnguided, input),
        )
        .await;

        let outcome = AdvisoryOutcome {
            user_based: into_outcome(Pattern::UserGuided, user_based),
            ai_based: into_outcome(Pattern::AiUnguided, ai_based),
            generated_at: Utc::now(),
            from_cache: false,
        };

        match outcome.complete() {
            Some(result) => self.cache.set(&key, result),
            None => info!("Not caching partial analysis for {}", key),
        }

        outcome
    }

    /// Generate and validate one pattern's proposal.
    async fn run_pattern(
        &self,
        pattern: Pattern,
        input: &InvestmentInput,
    ) -> Result<AllocationProposal, AdvisoryError> {
        let prompt = match pattern {
            Pattern::UserGuided => build_user_based_prompt(input),
            Pattern::AiUnguided => build_ai_based_prompt(input),
        };
        let request = GenerationRequest::new(prompt).with_config(self.generation.clone());

        let raw = self.generator.generate(&request).await?;
        let mut proposal = parse_and_validate(&raw)?.into_proposal(input.budget);

        match pattern {
            Pattern::UserGuided => proposal.recommended_categories = None,
            Pattern::AiUnguided if proposal.recommended_categories.is_none() => {
                proposal.recommended_categories = Some(Vec::new());
            }
            Pattern::AiUnguided => {}
        }
        Ok(proposal)
    }
}

fn into_outcome(
    pattern: Pattern,
    result: Result<AllocationProposal, AdvisoryError>,
) -> PatternOutcome {
    match result {
        Ok(proposal) => PatternOutcome::Available(proposal),
        Err(e) => {
            warn!("{} analysis unavailable: {}", pattern, e);
            PatternOutcome::Unavailable {
                reason: e.public_reason().to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_reason_hides_upstream_body() {
        let err = AdvisoryError::from(LlmError::Client {
            status: 403,
            body: "{\"error\":\"API key sk-secret revoked\"}".into(),
        });
        let reason = err.public_reason();
        assert_eq!(reason, "AI service returned an unusable response");
        assert!(!reason.contains("sk-secret"));
        assert!(err.to_string().contains("sk-secret"));
    }

    #[test]
    fn test_public_reason_by_kind() {
        let exhausted = AdvisoryError::from(LlmError::Exhausted {
            attempts: 3,
            last: Box::new(LlmError::Server {
                status: 503,
                body: "overloaded".into(),
            }),
        });
        assert_eq!(exhausted.public_reason(), "AI service is temporarily unavailable");
        assert_eq!(
            AdvisoryError::from(LlmError::MissingApiKey).public_reason(),
            "AI analysis is not configured"
        );
        assert_eq!(
            AdvisoryError::from(ValidationError::EmptyAllocations).public_reason(),
            "AI response failed validation"
        );
    }
}
