//! Token bucket admission control.
//!
//! Credits refill continuously at `rate` per second up to `capacity`.
//! [`TokenBucket::acquire`] suspends the caller until a credit is available:
//! up to `capacity` calls pass immediately, after which throughput settles
//! at `rate` calls per second.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::clock::SharedClock;
use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Which bucket a caller draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthTier {
    /// Caller presents its own API key and gets a dedicated bucket.
    Authenticated,
    /// Caller uses the public pool shared with everyone else.
    Shared,
}

impl AuthTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthTier::Authenticated => "authenticated",
            AuthTier::Shared => "shared",
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Continuous-refill token bucket.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
    clock: SharedClock,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(rate: f64, capacity: u32, clock: SharedClock) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: clock.now(),
            }),
            clock,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Refill then try to take one credit.
    ///
    /// Returns `Ok(())` when a credit was taken, or the time until one will
    /// be available. The whole check-and-take runs under one lock.
    fn try_take(&self) -> Result<(), Duration> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            let needed = 1.0 - state.tokens;
            // A zero or vanishing rate waits "forever" instead of overflowing.
            Err(Duration::try_from_secs_f64(needed / self.rate).unwrap_or(Duration::MAX))
        }
    }

    /// Take a credit without waiting.
    pub fn try_acquire(&self) -> bool {
        self.try_take().is_ok()
    }

    /// Take a credit, suspending until one accrues.
    ///
    /// Dropping the future while it waits spends nothing: credits are only
    /// deducted inside the locked check.
    pub async fn acquire(&self) {
        let start = self.clock.now();
        let mut waited = false;

        loop {
            match self.try_take() {
                Ok(()) => break,
                Err(wait) => {
                    tracing::debug!(
                        wait_ms = wait.as_millis() as u64,
                        "Rate limit reached, waiting for credit"
                    );
                    waited = true;
                    self.clock.sleep(wait).await;
                }
            }
        }

        if waited {
            metrics::record_rate_limit_wait(self.clock.now().saturating_duration_since(start));
        }
    }

    /// Credits currently available, refill included.
    pub fn available_tokens(&self) -> f64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = self
            .clock
            .now()
            .saturating_duration_since(state.last_refill)
            .as_secs_f64();
        (state.tokens + elapsed * self.rate).min(self.capacity)
    }
}

/// Hands out one bucket per tier.
///
/// Every client built from the same registry shares the same shared-pool
/// bucket, so concurrent unauthenticated clients stay under the pool limit
/// together.
#[derive(Debug)]
pub struct RateLimitRegistry {
    buckets: DashMap<AuthTier, Arc<TokenBucket>>,
    config: RateLimitConfig,
    clock: SharedClock,
}

impl RateLimitRegistry {
    pub fn new(config: RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
            clock,
        }
    }

    /// Get or create the bucket for a tier.
    pub fn bucket(&self, tier: AuthTier) -> Arc<TokenBucket> {
        self.buckets
            .entry(tier)
            .or_insert_with(|| {
                let (rate, burst) = match tier {
                    AuthTier::Authenticated => {
                        (self.config.authenticated_rps, self.config.authenticated_burst)
                    }
                    AuthTier::Shared => (self.config.shared_rps, self.config.shared_burst),
                };
                tracing::debug!(tier = tier.as_str(), rate, burst, "Creating token bucket");
                Arc::new(TokenBucket::new(rate, burst, self.clock.clone()))
            })
            .clone()
    }
}
