//! Health reporting.
//!
//! # Data Flow
//! ```text
//! ScholarClient::health()
//!     → circuit state + failure count (circuit_breaker.rs)
//!     → cache counters (cache/store.rs)
//!     → token level (rate_limit.rs)
//!     → HealthReport (serializable snapshot)
//! ```
//!
//! # Design Decisions
//! - Reports are read-only snapshots; producing one never changes state
//! - Overall status follows the circuit: closed is healthy, half-open is
//!   degraded, open is unavailable

use serde::Serialize;

use crate::cache::CacheStats;
use crate::resilience::CircuitState;

/// Overall availability as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unavailable,
}

impl From<CircuitState> for HealthStatus {
    fn from(state: CircuitState) -> Self {
        match state {
            CircuitState::Closed => HealthStatus::Healthy,
            CircuitState::HalfOpen => HealthStatus::Degraded,
            CircuitState::Open => HealthStatus::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitReport {
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitReport {
    pub tier: &'static str,
    pub available_tokens: f64,
    pub capacity: f64,
    pub rate_per_second: f64,
}

/// Snapshot of the client's resilience state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub circuit: CircuitReport,
    pub cache: CacheStats,
    pub rate_limit: RateLimitReport,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
