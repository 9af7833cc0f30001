//! Error taxonomy for generation API calls.

use std::time::Duration;

use thiserror::Error;

/// Coarse classification of an [`LlmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Missing API key or similar; never retried.
    Configuration,
    /// Connection failure or timeout.
    Network,
    /// HTTP 429.
    RateLimit,
    /// HTTP 5xx.
    Server,
    /// Any other non-2xx status.
    Client,
    /// 2xx without candidates.
    EmptyResponse,
    /// 2xx whose body is not the expected shape.
    Decode,
    /// All attempts used up.
    Exhausted,
}

impl LlmErrorKind {
    /// Whether a failure of this kind is plausibly transient.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::Server)
    }
}

/// Errors from the generation client.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Rate limit exceeded (429): {body}")]
    RateLimited { body: String },

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("API error: {status} - {body}")]
    Client { status: u16, body: String },

    #[error("No response from generation API")]
    EmptyResponse,

    #[error("Failed to decode API response: {0}")]
    Decode(String),

    #[error("Failed after all {attempts} retry attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<LlmError>,
    },
}

impl LlmError {
    pub fn kind(&self) -> LlmErrorKind {
        match self {
            Self::MissingApiKey => LlmErrorKind::Configuration,
            Self::Network(_) | Self::Timeout(_) => LlmErrorKind::Network,
            Self::RateLimited { .. } => LlmErrorKind::RateLimit,
            Self::Server { .. } => LlmErrorKind::Server,
            Self::Client { .. } => LlmErrorKind::Client,
            Self::EmptyResponse => LlmErrorKind::EmptyResponse,
            Self::Decode(_) => LlmErrorKind::Decode,
            Self::Exhausted { .. } => LlmErrorKind::Exhausted,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Build the error for a non-2xx response.
    pub fn from_status(status: u16, body: String) -> Self {
        match classify_http_status(status) {
            LlmErrorKind::RateLimit => Self::RateLimited { body },
            LlmErrorKind::Server => Self::Server { status, body },
            _ => Self::Client { status, body },
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Classify a non-2xx HTTP status.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimit,
        500..=599 => LlmErrorKind::Server,
        _ => LlmErrorKind::Client,
    }
}
