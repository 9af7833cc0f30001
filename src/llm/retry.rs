//! Retry-with-backoff combinator.
//!
//! `retry_with_backoff` drives any fallible async operation under a
//! [`RetryConfig`]: transient failures wait `base_delay * 2^attempt` and try
//! again, fatal failures return at once, and running out of attempts yields
//! [`RetryError::Exhausted`] carrying the last cause. Waiting goes through a
//! [`Sleeper`] so tests can observe the schedule without real time passing.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

/// Whether an error is worth another attempt.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for super::LlmError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

/// Attempt budget and backoff base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait after the failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Suspends the current task for a while.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Terminal outcome of [`retry_with_backoff`].
#[derive(Debug)]
pub enum RetryError<E> {
    /// A non-transient failure; no further attempts were made.
    Fatal(E),
    /// Every attempt failed transiently.
    Exhausted { attempts: u32, last: E },
}

/// Run `op` until it succeeds, fails fatally, or the attempt budget is spent.
///
/// `op` receives the 0-based attempt number. No wait follows the final attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let attempts = config.attempts();
    let mut attempt = 0;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(RetryError::Fatal(e)),
            Err(e) => {
                if attempt + 1 >= attempts {
                    return Err(RetryError::Exhausted { attempts, last: e });
                }
                let wait = config.delay_for(attempt);
                warn!(
                    "{}. Waiting {}ms before retry {}/{}",
                    e,
                    wait.as_millis(),
                    attempt + 1,
                    attempts
                );
                sleeper.sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
