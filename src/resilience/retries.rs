//! Retry logic.
//!
//! # Responsibilities
//! - Re-run an operation whose error is classified retryable
//! - Wait with exponential backoff + jitter between attempts
//! - Honor a server-provided `Retry-After` in place of the computed backoff
//!
//! # Design Decisions
//! - Classification happens once at the transport boundary; this module only
//!   reads the `retryable` flag
//! - `max_attempts` counts every attempt, the first one included
//! - A `Retry-After` hint is capped at `max_delay_ms`; a zero hint falls
//!   back to the computed backoff
//! - Backoff waits go through the injected clock, so dropping `execute`
//!   mid-wait abandons the call without side effects

use std::future::Future;
use std::time::Duration;

use crate::clock::SharedClock;
use crate::config::RetryConfig;
use crate::error::{ApiError, ApiResult};
use crate::observability::metrics;
use crate::resilience::backoff::{calculate_backoff, with_jitter};

/// Bounded retry with backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    clock: SharedClock,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig, clock: SharedClock) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Attempts allowed per call.
    pub fn max_attempts(&self) -> u32 {
        if self.config.enabled {
            self.config.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Delay before the attempt following failed attempt number `attempt`.
    pub fn delay_for(&self, attempt: u32, err: &ApiError) -> Duration {
        match err.retry_after().filter(|hint| !hint.is_zero()) {
            Some(hint) => {
                let ceiling = Duration::from_millis(self.config.max_delay_ms);
                if hint > ceiling {
                    tracing::warn!(
                        retry_after_ms = hint.as_millis() as u64,
                        max_delay_ms = self.config.max_delay_ms,
                        "Retry-After exceeds max delay, capping"
                    );
                }
                with_jitter(hint.min(ceiling), self.config.jitter_ratio)
            }
            None => calculate_backoff(
                attempt,
                self.config.base_delay_ms,
                self.config.max_delay_ms,
                self.config.jitter_ratio,
            ),
        }
    }

    /// Run `operation`, retrying retryable failures.
    ///
    /// The closure receives the 1-based attempt number. The last error is
    /// returned unchanged once attempts run out or a fatal error occurs.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> ApiResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= max_attempts {
                if max_attempts > 1 {
                    tracing::warn!(
                        attempts = attempt,
                        error = %err,
                        "Giving up after exhausting retry attempts"
                    );
                    metrics::record_retry("exhausted");
                }
                return Err(err);
            }

            let delay = self.delay_for(attempt, &err);
            tracing::info!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                kind = err.kind().label(),
                error = %err,
                "Retrying after failure"
            );
            metrics::record_retry(err.kind().label());

            self.clock.sleep(delay).await;
            attempt += 1;
        }
    }
}
