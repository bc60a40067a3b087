//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! ApiRequest
//!     → fingerprint.rs (method + endpoint + sorted params + canonical body)
//!     → store.rs get (hit: return, bypassing rate limit and breaker)
//!     → on success: ttl.rs picks the lifetime → store.rs set
//! ```
//!
//! # Design Decisions
//! - Recency, not insertion order, decides eviction
//! - Expiry is checked on access; there is no sweeper task
//! - POST requests are cached only for allow-listed read-only endpoints

pub mod fingerprint;
pub mod store;
pub mod ttl;

pub use fingerprint::Fingerprint;
pub use store::{CacheEntry, CacheStats, ResponseCache};
pub use ttl::{EndpointShape, TtlPolicy};
