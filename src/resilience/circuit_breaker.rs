//! Circuit breaker for remote API protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: remote assumed down, requests fail fast
//! - Half-Open: a bounded number of trial requests test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive counted failures >= failure_threshold
//! Open → Half-Open: first admission check after recovery_timeout
//! Half-Open → Closed: a trial request succeeds
//! Half-Open → Open: a trial request fails (recovery window restarts)
//! ```
//!
//! Only failures whose `counts_toward_circuit` flag is set move the breaker.
//! A 404 or 429 proves the remote is reachable, so it passes through.
//!
//! Admission and recording each run under a single lock, so two callers can
//! never both take the last trial slot. Every transition bumps a generation
//! number; results reported by calls admitted under an older generation are
//! ignored.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use crate::clock::SharedClock;
use crate::config::CircuitBreakerConfig;
use crate::error::{ApiError, ApiResult};
use crate::observability::metrics;

/// Current state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    /// When the breaker last entered `Open`.
    opened_at: Option<Instant>,
    /// Trial calls admitted in the current half-open period.
    half_open_calls: u32,
    generation: u64,
}

/// Three-state circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
    clock: SharedClock,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig, clock: SharedClock) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
                half_open_calls: 0,
                generation: 0,
            }),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `operation` under breaker protection.
    ///
    /// Fails fast with a circuit-open error, without calling `operation`,
    /// when admission is denied. Otherwise the operation's result is
    /// recorded and returned unchanged.
    pub async fn call<T, F, Fut>(&self, operation: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let permit = self.try_acquire()?;
        match operation().await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(err) => {
                permit.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Admission check.
    ///
    /// The returned permit must be settled with `record_success` or
    /// `record_failure`. A permit dropped unsettled (the caller abandoned
    /// the call) records nothing and hands back its trial slot.
    pub fn try_acquire(&self) -> ApiResult<CallPermit<'_>> {
        let mut inner = self.lock();
        self.maybe_half_open(&mut inner);

        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(self, inner.generation, false)),
            CircuitState::Open => Err(ApiError::circuit_open(
                "Circuit breaker is open. Service appears to be down; try again later.",
            )),
            CircuitState::HalfOpen => {
                if inner.half_open_calls >= self.config.half_open_max_calls {
                    return Err(ApiError::circuit_open(
                        "Circuit breaker: max half-open calls reached, waiting for trial result",
                    ));
                }
                inner.half_open_calls += 1;
                tracing::debug!(
                    trial = inner.half_open_calls,
                    max = self.config.half_open_max_calls,
                    "Circuit breaker admitting trial call"
                );
                Ok(CallPermit::new(self, inner.generation, true))
            }
        }
    }

    /// Lazy Open → HalfOpen transition, evaluated at admission time.
    fn maybe_half_open(&self, inner: &mut BreakerState) {
        if inner.state != CircuitState::Open {
            return;
        }
        let Some(opened_at) = inner.opened_at else {
            return;
        };
        let elapsed = self.clock.now().saturating_duration_since(opened_at);
        if elapsed >= self.config.recovery_timeout() {
            tracing::info!(
                elapsed_secs = elapsed.as_secs_f64(),
                "Circuit breaker transitioning to HALF_OPEN"
            );
            self.transition(inner, CircuitState::HalfOpen);
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState) {
        inner.state = to;
        inner.half_open_calls = 0;
        inner.generation += 1;
        match to {
            CircuitState::Open => inner.opened_at = Some(self.clock.now()),
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::HalfOpen => {}
        }
        metrics::record_circuit_transition(to);
    }

    fn on_success(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        match inner.state {
            CircuitState::HalfOpen => {
                tracing::info!("Circuit breaker: trial call succeeded, closing circuit");
                self.transition(&mut inner, CircuitState::Closed);
            }
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, generation: u64, trial: bool, err: &ApiError) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }

        if !err.counts_toward_circuit() {
            if trial {
                release_trial_slot(&mut inner);
            }
            return;
        }

        inner.failure_count += 1;
        match inner.state {
            CircuitState::HalfOpen => {
                tracing::warn!(
                    error = %err,
                    "Circuit breaker: trial call failed, reopening circuit"
                );
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Closed if inner.failure_count >= self.config.failure_threshold => {
                tracing::warn!(
                    failures = inner.failure_count,
                    error = %err,
                    "Circuit breaker: failure threshold reached, opening circuit"
                );
                self.transition(&mut inner, CircuitState::Open);
            }
            _ => {}
        }
    }

    fn on_abandon(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation {
            release_trial_slot(&mut inner);
        }
    }

    /// Stored state. An open breaker whose recovery window has passed still
    /// reports `Open` until the next admission check.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive counted failures.
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Return to the initial closed state.
    pub fn reset(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Closed);
        inner.opened_at = None;
    }
}

fn release_trial_slot(inner: &mut BreakerState) {
    if inner.state == CircuitState::HalfOpen {
        inner.half_open_calls = inner.half_open_calls.saturating_sub(1);
    }
}

/// Admission granted by [`CircuitBreaker::try_acquire`].
#[derive(Debug)]
#[must_use = "settle the permit with record_success or record_failure"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, generation: u64, trial: bool) -> Self {
        Self {
            breaker,
            generation,
            trial,
            settled: false,
        }
    }

    /// Whether this call is a half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.generation);
    }

    pub fn record_failure(mut self, err: &ApiError) {
        self.settled = true;
        self.breaker.on_failure(self.generation, self.trial, err);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.on_abandon(self.generation);
        }
    }
}
