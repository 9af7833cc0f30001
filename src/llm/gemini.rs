//! Gemini `generateContent` client.
//!
//! Each attempt runs under the configured timeout; rate limiting, 5xx and
//! network failures are retried with exponential backoff, everything else
//! fails fast.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::retry::{retry_with_backoff, RetryConfig, RetryError, Sleeper, TokioSleeper};
use super::{GenerationConfig, GenerationRequest, LlmError, TextGenerator};
use crate::config::GeminiConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiResponse {
    fn into_first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Client for the Gemini text-generation endpoint.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: GeminiConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            client: Client::new(),
            config,
            sleeper,
        }
    }

    fn retry_config(&self, max_retries: Option<u32>) -> RetryConfig {
        RetryConfig::new(
            max_retries.unwrap_or(self.config.max_retries),
            self.config.retry_base_delay,
        )
    }

    /// One attempt: send, check status, extract the first candidate's text.
    async fn attempt(&self, api_key: &str, body: &GeminiRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("Failed to read {} error body: {}", status, e);
                    format!("<unreadable body: {}>", e)
                }
            };
            return Err(LlmError::from_status(status.as_u16(), text));
        }

        // A body cut off mid-stream is a transport failure, not a bad payload.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        let parsed: GeminiResponse =
            serde_json::from_slice(&bytes).map_err(|e| LlmError::Decode(e.to_string()))?;
        parsed.into_first_text().ok_or(LlmError::EmptyResponse)
    }

    async fn attempt_with_timeout(
        &self,
        api_key: &str,
        body: &GeminiRequest<'_>,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        match tokio::time::timeout(timeout, self.attempt(api_key, body)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(timeout)),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey)?;

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: &request.config,
        };
        let retry = self.retry_config(request.max_retries);
        let timeout = self.config.timeout;

        let result = retry_with_backoff(&retry, self.sleeper.as_ref(), |attempt| {
            let body = &body;
            async move {
                let text = self.attempt_with_timeout(api_key, body, timeout).await?;
                tracing::info!("API call succeeded on attempt {}", attempt + 1);
                Ok(text)
            }
        })
        .await;

        match result {
            Ok(text) => Ok(text),
            Err(RetryError::Fatal(e)) => Err(e),
            Err(RetryError::Exhausted { attempts, last }) => {
                tracing::error!("Gemini API call failed after {} attempts: {}", attempts, last);
                Err(LlmError::Exhausted {
                    attempts,
                    last: Box::new(last),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let config = GenerationConfig::default();
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: "hello" }],
            }],
            generation_config: &config,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn test_first_text_extraction() {
        let parsed: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"first"},{"text":"second"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.into_first_text().as_deref(), Some("first"));

        let empty: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.into_first_text().is_none());

        let missing: GeminiResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(missing.into_first_text().is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_fatal() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: None,
            endpoint: "http://127.0.0.1:9/unused".into(),
            ..GeminiConfig::default()
        });
        let err = client
            .generate(&GenerationRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }
}
