//! Bounded, time-limited store of completed analyses.
//!
//! # Policy
//! - Entries older than the TTL are dropped lazily on `get` and by the
//!   periodic sweep.
//! - When full, inserting a new key evicts the least recently accessed entry.
//!   Re-inserting an existing key never evicts.
//!
//! A single mutex guards the map; no operation awaits while holding it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use crate::advisor::AnalysisResult;
use crate::config::CacheConfig;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: AnalysisResult,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    hit_count: u64,
}

impl CacheEntry {
    /// Age at `now`; a clock that went backwards counts as zero.
    fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or_default()
    }
}

/// Diagnostic view of one entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryStats {
    pub key: String,
    pub age_secs: u64,
    pub age_minutes: u64,
    pub hit_count: u64,
    pub last_accessed_at: DateTime<Utc>,
}

/// Read-only snapshot returned by [`AnalysisCache::stats`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub enabled: bool,
    pub size: usize,
    pub max_size: usize,
    pub ttl_hours: f64,
    pub entries: Vec<CacheEntryStats>,
}

/// Process-wide analysis cache.
pub struct AnalysisCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl AnalysisCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up `key`, recording the hit. Expired entries are removed.
    pub fn get(&self, key: &str) -> Option<AnalysisResult> {
        if !self.config.enabled {
            return None;
        }

        let now = self.clock.now();
        let mut entries = self.lock();

        let Some(entry) = entries.get_mut(key) else {
            debug!("[Cache] MISS for {}", key);
            return None;
        };

        let age = entry.age(now);
        if age > self.config.ttl {
            debug!("[Cache] EXPIRED for {} (age: {}m)", key, age.as_secs() / 60);
            entries.remove(key);
            return None;
        }

        entry.hit_count += 1;
        entry.last_accessed_at = now;
        debug!(
            "[Cache] HIT for {} (age: {}m, hits: {})",
            key,
            age.as_secs() / 60,
            entry.hit_count
        );
        Some(entry.result.clone())
    }

    /// Store `result` under `key`, evicting the LRU entry if a new key
    /// would exceed capacity.
    pub fn set(&self, key: &str, result: AnalysisResult) {
        if !self.config.enabled {
            return;
        }
        if self.config.max_size == 0 {
            debug!("[Cache] SKIP for {} (max size is 0)", key);
            return;
        }

        let now = self.clock.now();
        let mut entries = self.lock();

        if entries.len() >= self.config.max_size && !entries.contains_key(key) {
            evict_lru(&mut entries);
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                result,
                created_at: now,
                last_accessed_at: now,
                hit_count: 0,
            },
        );
        debug!(
            "[Cache] SET for {} (total: {}/{})",
            key,
            entries.len(),
            self.config.max_size
        );
    }

    /// Remove every entry.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let removed = entries.len();
        entries.clear();
        info!("[Cache] CLEARED ({} entries removed)", removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.lock();

        let mut snapshot: Vec<CacheEntryStats> = entries
            .iter()
            .map(|(key, entry)| {
                let age_secs = entry.age(now).as_secs();
                CacheEntryStats {
                    key: key.clone(),
                    age_secs,
                    age_minutes: (age_secs + 30) / 60,
                    hit_count: entry.hit_count,
                    last_accessed_at: entry.last_accessed_at,
                }
            })
            .collect();
        snapshot.sort_by(|a, b| a.key.cmp(&b.key));

        CacheStats {
            enabled: self.config.enabled,
            size: entries.len(),
            max_size: self.config.max_size,
            ttl_hours: self.config.ttl.as_secs_f64() / 3600.0,
            entries: snapshot,
        }
    }

    /// Drop every entry older than the TTL. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let mut entries = self.lock();

        let before = entries.len();
        entries.retain(|_, entry| entry.age(now) <= ttl);
        let cleaned = before - entries.len();

        if cleaned > 0 {
            info!("[Cache] CLEANUP: {} expired entries removed", cleaned);
        }
        cleaned
    }
}

/// Remove the least recently accessed entry; ties go to the smallest key.
fn evict_lru(entries: &mut HashMap<String, CacheEntry>) {
    let oldest = entries
        .iter()
        .min_by(|(ka, a), (kb, b)| {
            a.last_accessed_at
                .cmp(&b.last_accessed_at)
                .then_with(|| ka.cmp(kb))
        })
        .map(|(key, _)| key.clone());

    if let Some(key) = oldest {
        entries.remove(&key);
        info!("[Cache] EVICTED {} (LRU)", key);
    }
}
