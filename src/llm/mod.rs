//! Text-generation client module.
//!
//! This module provides a trait-based abstraction over the generation API,
//! with Gemini as the primary implementation. Retry policy lives in
//! [`retry`] and is independent of the transport.

mod error;
mod gemini;
pub mod retry;

pub use error::{classify_http_status, LlmError, LlmErrorKind};
pub use gemini::GeminiClient;
pub use retry::{retry_with_backoff, RetryConfig, RetryError, Sleeper, TokioSleeper, Transient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

/// A single generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub config: GenerationConfig,
    /// Overrides the client's configured attempt count.
    pub max_retries: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            config: GenerationConfig::default(),
            max_retries: None,
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Trait for text-generation clients.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `request`, returning the first candidate's text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}
