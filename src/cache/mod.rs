//! Analysis cache - reuse allocation proposals across similar requests.
//!
//! # Key Concepts
//! - Key: normalized category plus a coarse budget bucket (`key::normalize`)
//! - Store: TTL- and capacity-bounded map with LRU eviction (`AnalysisCache`)
//! - Clock: injected time source so expiry is testable
//! - Sweep: background task that drops expired entries between accesses

mod clock;
mod key;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{budget_bucket, normalize, normalize_category};
pub use store::{AnalysisCache, CacheEntryStats, CacheStats};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Spawn the periodic expiry sweep.
///
/// The first tick fires after one full `interval`. Returns `None` when the
/// cache is disabled.
pub fn spawn_cleanup_task(cache: Arc<AnalysisCache>, interval: Duration) -> Option<JoinHandle<()>> {
    if !cache.config().enabled {
        return None;
    }

    Some(tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        loop {
            ticker.tick().await;
            cache.cleanup_expired();
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    #[tokio::test]
    async fn test_cleanup_task_not_spawned_when_disabled() {
        let cache = Arc::new(AnalysisCache::new(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        }));
        assert!(spawn_cleanup_task(cache, Duration::from_secs(1)).is_none());
    }

    #[tokio::test]
    async fn test_cleanup_task_sweeps_expired_entries() {
        let clock = Arc::new(ManualClock::default());
        let config = CacheConfig {
            ttl: Duration::from_secs(60),
            ..CacheConfig::default()
        };
        let cache = Arc::new(AnalysisCache::with_clock(config, clock.clone()));
        cache.set("sns:0-100k", sample_result());
        clock.advance(chrono::Duration::seconds(61));

        let handle = spawn_cleanup_task(Arc::clone(&cache), Duration::from_millis(5)).unwrap();
        for _ in 0..200 {
            if cache.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(cache.is_empty());
        assert!(!handle.is_finished());
        handle.abort();
    }

    fn sample_result() -> crate::advisor::AnalysisResult {
        let proposal = crate::advisor::AllocationProposal {
            allocations: vec![crate::advisor::AllocationItem::new(
                "SNS".into(),
                100.0,
                "reach".into(),
                50_000,
            )],
            total_budget: 50_000,
            summary: "all in".into(),
            recommended_categories: None,
        };
        crate::advisor::AnalysisResult {
            user_based: proposal.clone(),
            ai_based: proposal,
            generated_at: chrono::Utc::now(),
        }
    }
}
