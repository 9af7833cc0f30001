//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//! - `AI_CACHE_ENABLED` - Cache on/off (default: true, only `false` disables)
//! - `AI_CACHE_TTL_HOURS` - Entry time-to-live in hours (default: 24)
//! - `AI_CACHE_MAX_SIZE` - Maximum cached analyses (default: 100)
//! - `AI_CACHE_CLEANUP_INTERVAL_SECS` - Expiry sweep interval (default: 3600)
//! - `GEMINI_API_KEY` - API key for the generation endpoint (required at call time)
//! - `GEMINI_API_ENDPOINT` - Override the `generateContent` endpoint
//! - `GEMINI_API_TIMEOUT_MS` - Per-attempt timeout (default: 30000)
//! - `GEMINI_MAX_RETRIES` - Attempts per call (default: 3)
//! - `GEMINI_RETRY_DELAY_MS` - Base backoff delay (default: 1000)
//! - `HOST` / `PORT` - Bind address (default: 127.0.0.1:3000)
//! - `JWT_SECRET` - HS256 secret for the protected API routes

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// Analysis cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    /// Zero means nothing is ever stored.
    pub max_size: usize,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(24 * 60 * 60),
            max_size: 100,
            cleanup_interval: Duration::from_secs(60 * 60),
        }
    }
}

/// Generation API client settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout: Duration::from_millis(30_000),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1_000),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub cache: CacheConfig,
    pub gemini: GeminiConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults; nothing here is fatal.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let cache_defaults = CacheConfig::default();
        let ttl_hours: u64 = parse_or(&get, "AI_CACHE_TTL_HOURS", 24);
        // Negative sizes degrade to a cache that never stores.
        let max_size: i64 = parse_or(&get, "AI_CACHE_MAX_SIZE", cache_defaults.max_size as i64);
        let cleanup_secs: u64 = parse_or(
            &get,
            "AI_CACHE_CLEANUP_INTERVAL_SECS",
            cache_defaults.cleanup_interval.as_secs(),
        );
        let cache = CacheConfig {
            enabled: get("AI_CACHE_ENABLED").map_or(true, |v| v != "false"),
            ttl: Duration::from_secs(ttl_hours.saturating_mul(60 * 60)),
            max_size: usize::try_from(max_size).unwrap_or(0),
            cleanup_interval: Duration::from_secs(cleanup_secs.max(1)),
        };

        let gemini = GeminiConfig {
            api_key: get("GEMINI_API_KEY"),
            endpoint: get("GEMINI_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
            timeout: Duration::from_millis(parse_or(&get, "GEMINI_API_TIMEOUT_MS", 30_000)),
            max_retries: parse_or(&get, "GEMINI_MAX_RETRIES", 3),
            retry_base_delay: Duration::from_millis(parse_or(&get, "GEMINI_RETRY_DELAY_MS", 1_000)),
        };

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            host: get("HOST").unwrap_or(server_defaults.host),
            port: parse_or(&get, "PORT", server_defaults.port),
            jwt_secret: get("JWT_SECRET"),
        };

        Self {
            cache,
            gemini,
            server,
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!("Invalid value {:?} for {}, using default {}", raw, key, default);
                default
            }
        },
    }
}
