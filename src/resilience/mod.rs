//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request that missed the cache:
//!     → rate_limit.rs (acquire a credit, may suspend)
//!     → circuit_breaker.rs (fail fast if open, admit trial if half-open)
//!     → retries.rs (re-run retryable failures with backoff.rs delays)
//!     → circuit_breaker.rs (record final outcome)
//! ```
//!
//! # Design Decisions
//! - Rate limiting gates network I/O before the breaker is consulted, so a
//!   saturated caller never shows up as circuit failures
//! - The breaker sees one outcome per logical request, after retries
//! - All timing goes through the injected clock

pub mod backoff;
pub mod circuit_breaker;
pub mod rate_limit;
pub mod retries;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitState};
pub use rate_limit::{AuthTier, RateLimitRegistry, TokenBucket};
pub use retries::RetryPolicy;
