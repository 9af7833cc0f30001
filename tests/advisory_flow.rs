//! End-to-end orchestrator behaviour with a fake generator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use allocation_advisor::advisor::{
    simple_allocation, AdvisoryOrchestrator, InvestmentInput, PatternOutcome,
};
use allocation_advisor::cache::AnalysisCache;
use allocation_advisor::config::{CacheConfig, GeminiConfig};
use allocation_advisor::llm::{GeminiClient, GenerationRequest, LlmError, TextGenerator};
use async_trait::async_trait;

const USER_BASED: &str = r#"```json
{
  "allocations": [
    {"category": "Instagram ads", "percentage": 50, "amount": 1, "reasoning": "visual reach"},
    {"category": "YouTube ads", "percentage": 30, "amount": 1, "reasoning": "video reach"},
    {"category": "X ads", "percentage": 20, "amount": 1, "reasoning": "real-time buzz"}
  ],
  "summary": "Lean on visual platforms."
}
```"#;

const AI_BASED: &str = r#"{"allocations":[
  {"category":"SEO","percentage":45,"amount":0,"reasoning":"long-term traffic"},
  {"category":"Content marketing","percentage":30,"amount":0,"reasoning":"trust"},
  {"category":"Influencer marketing","percentage":20,"amount":0,"reasoning":"awareness"}
],"summary":"Balanced mix.","recommendedCategories":["SEO","Content marketing"]}"#;

type Responder = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

/// Answers by prompt kind and counts calls.
struct FakeGenerator {
    calls: AtomicUsize,
    respond: Responder,
}

impl FakeGenerator {
    fn new(respond: impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            respond: Box::new(respond),
        })
    }

    fn healthy() -> Arc<Self> {
        Self::new(|prompt| Ok(by_kind(prompt, USER_BASED, AI_BASED).to_string()))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn is_unguided(prompt: &str) -> bool {
    prompt.contains("recommendedCategories")
}

fn by_kind<'a>(prompt: &str, user: &'a str, ai: &'a str) -> &'a str {
    if is_unguided(prompt) {
        ai
    } else {
        user
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(&request.prompt)
    }
}

fn cache(enabled: bool) -> Arc<AnalysisCache> {
    Arc::new(AnalysisCache::new(CacheConfig {
        enabled,
        ..CacheConfig::default()
    }))
}

fn input(industry: &str, budget: u64) -> InvestmentInput {
    InvestmentInput {
        company_name: "Acme".to_string(),
        industry: industry.to_string(),
        budget,
        details: Some("Launching a new product line".to_string()),
    }
}

#[tokio::test]
async fn test_both_patterns_available() {
    let generator = FakeGenerator::healthy();
    let advisor = AdvisoryOrchestrator::new(generator.clone(), cache(true));

    let outcome = advisor.advise(&input("SNS ads", 1_000_000)).await;
    assert!(!outcome.from_cache);
    assert_eq!(generator.calls(), 2);

    let user = outcome.user_based.proposal().unwrap();
    assert_eq!(user.total_budget, 1_000_000);
    assert_eq!(user.allocations.len(), 3);
    assert_eq!(user.allocations[0].amount, 500_000);
    assert!(user.recommended_categories.is_none());

    // 45 + 30 + 20 = 95: the deficit goes to SEO.
    let ai = outcome.ai_based.proposal().unwrap();
    assert_eq!(ai.allocations[0].percentage, 50.0);
    assert_eq!(ai.allocations[0].amount, 500_000);
    assert_eq!(
        ai.recommended_categories.as_deref(),
        Some(&["SEO".to_string(), "Content marketing".to_string()][..])
    );

    let view = simple_allocation(&outcome).unwrap();
    assert_eq!(view["SEO"], 50.0);
    assert_eq!(view["Influencer marketing"], 20.0);
    assert!(outcome.complete().is_some());
}

#[tokio::test]
async fn test_disabled_cache_calls_api_every_time() {
    let generator = FakeGenerator::healthy();
    let advisor = AdvisoryOrchestrator::new(generator.clone(), cache(false));

    advisor.advise(&input("SNS ads", 300_000)).await;
    let second = advisor.advise(&input("SNS ads", 300_000)).await;

    assert_eq!(generator.calls(), 4);
    assert!(!second.from_cache);
}

#[tokio::test]
async fn test_enabled_cache_reuses_result() {
    let generator = FakeGenerator::healthy();
    let shared = cache(true);
    let advisor = AdvisoryOrchestrator::new(generator.clone(), shared.clone());

    let first = advisor.advise(&input("SNS ads", 300_000)).await;
    let second = advisor.advise(&input("  sns   ADS ", 300_000)).await;

    assert_eq!(generator.calls(), 2);
    assert!(second.from_cache);
    assert_eq!(second.user_based, first.user_based);
    assert_eq!(second.ai_based, first.ai_based);
    assert_eq!(second.generated_at, first.generated_at);

    let stats = shared.stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.entries[0].key, "sns-ads:100k-500k");
    assert_eq!(stats.entries[0].hit_count, 1);
}

#[tokio::test]
async fn test_cache_hit_reprices_for_requested_budget() {
    let generator = FakeGenerator::healthy();
    let advisor = AdvisoryOrchestrator::new(generator.clone(), cache(true));

    advisor.advise(&input("SNS ads", 200_000)).await;
    let second = advisor.advise(&input("SNS ads", 400_000)).await;

    assert_eq!(generator.calls(), 2);
    assert!(second.from_cache);
    let user = second.user_based.proposal().unwrap();
    assert_eq!(user.total_budget, 400_000);
    assert_eq!(user.allocations[0].amount, 200_000);
    assert_eq!(user.allocations[0].percentage, 50.0);
}

#[tokio::test]
async fn test_different_bucket_misses() {
    let generator = FakeGenerator::healthy();
    let advisor = AdvisoryOrchestrator::new(generator.clone(), cache(true));

    advisor.advise(&input("SNS ads", 400_000)).await;
    advisor.advise(&input("SNS ads", 600_000)).await;

    assert_eq!(generator.calls(), 4);
}

#[tokio::test]
async fn test_one_failed_pattern_degrades_and_is_not_cached() {
    let generator = FakeGenerator::new(|prompt| {
        if is_unguided(prompt) {
            Err(LlmError::Exhausted {
                attempts: 3,
                last: Box::new(LlmError::Server {
                    status: 503,
                    body: "overloaded".into(),
                }),
            })
        } else {
            Ok(USER_BASED.to_string())
        }
    });
    let shared = cache(true);
    let advisor = AdvisoryOrchestrator::new(generator.clone(), shared.clone());

    let outcome = advisor.advise(&input("SNS ads", 1_000_000)).await;
    assert!(outcome.user_based.is_available());
    match &outcome.ai_based {
        PatternOutcome::Unavailable { reason } => {
            assert_eq!(reason, "AI service is temporarily unavailable")
        }
        other => panic!("expected unavailable, got {:?}", other),
    }
    assert!(outcome.complete().is_none());
    assert!(simple_allocation(&outcome).is_none());
    assert!(shared.is_empty());

    advisor.advise(&input("SNS ads", 1_000_000)).await;
    assert_eq!(generator.calls(), 4);
}

#[tokio::test]
async fn test_invalid_output_is_unavailable_and_never_cached() {
    let bad = r#"{"allocations":[{"category":"A","percentage":150,"amount":0,"reasoning":"x"}],"summary":"s"}"#;
    let generator = FakeGenerator::new(move |prompt| Ok(by_kind(prompt, bad, "not json at all").to_string()));
    let shared = cache(true);
    let advisor = AdvisoryOrchestrator::new(generator.clone(), shared.clone());

    let outcome = advisor.advise(&input("SNS ads", 1_000_000)).await;
    assert!(outcome.is_empty());
    match &outcome.user_based {
        PatternOutcome::Unavailable { reason } => assert_eq!(reason, "AI response failed validation"),
        other => panic!("expected unavailable, got {:?}", other),
    }
    assert!(shared.is_empty());
}

#[tokio::test]
async fn test_missing_api_key_degrades_without_panicking() {
    let client = Arc::new(GeminiClient::new(GeminiConfig {
        api_key: None,
        ..GeminiConfig::default()
    }));
    let advisor = AdvisoryOrchestrator::new(client, cache(true));

    let outcome = advisor.advise(&input("SNS ads", 1_000_000)).await;
    assert!(outcome.is_empty());
    match &outcome.user_based {
        PatternOutcome::Unavailable { reason } => assert_eq!(reason, "AI analysis is not configured"),
        other => panic!("expected unavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upstream_error_body_is_not_exposed() {
    let generator = FakeGenerator::new(|_| {
        Err(LlmError::Client {
            status: 401,
            body: "invalid key AIza-leaked".into(),
        })
    });
    let advisor = AdvisoryOrchestrator::new(generator, cache(true));

    let outcome = advisor.advise(&input("SNS ads", 1_000_000)).await;
    let json = serde_json::to_string(&outcome).unwrap();
    assert!(!json.contains("AIza-leaked"));
    match &outcome.user_based {
        PatternOutcome::Unavailable { reason } => {
            assert_eq!(reason, "AI service returned an unusable response")
        }
        other => panic!("expected unavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unguided_without_recommendations_gets_empty_list() {
    let ai_plain = r#"{"allocations":[{"category":"SEO","percentage":100,"amount":0,"reasoning":"x"}],"summary":"s"}"#;
    let generator = FakeGenerator::new(move |prompt| Ok(by_kind(prompt, USER_BASED, ai_plain).to_string()));
    let advisor = AdvisoryOrchestrator::new(generator, cache(false));

    let outcome = advisor.advise(&input("SNS ads", 1_000)).await;
    let ai = outcome.ai_based.proposal().unwrap();
    assert_eq!(ai.recommended_categories, Some(Vec::new()));
}
