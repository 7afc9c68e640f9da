//! Retry with exponential backoff around webhook dispatch.
//!
//! Only failures classified as retryable are tried again. The delay before
//! retry `k` is `base_delay * 2^(k-1)`, so the default policy waits 1s then
//! 2s before giving up on the third attempt.

use std::future::Future;
use std::time::Duration;

use crate::domain::webhook::WebhookError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Never less than one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        event_id: &str,
        event_type: &str,
        mut op: F,
    ) -> Result<T, WebhookError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, WebhookError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            tracing::debug!(event_id, event_type, attempt, "Dispatching webhook event");

            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(
                            event_id,
                            event_type,
                            attempt,
                            "Webhook event succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    tracing::debug!(
                        event_id,
                        event_type,
                        attempt,
                        error = %err,
                        "Permanent failure, not retrying"
                    );
                    return Err(err);
                }
                Err(err) if attempt >= max_attempts => {
                    tracing::error!(
                        event_id,
                        event_type,
                        attempts = attempt,
                        error = %err,
                        "Webhook event failed after exhausting retries"
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        event_id,
                        event_type,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
