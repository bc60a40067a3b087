//! Resilient client library for the Semantic Scholar APIs.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                  SCHOLAR CLIENT                   │
//!                         │                                                   │
//!     get / post          │  ┌─────────┐   miss   ┌────────────┐              │
//!     ────────────────────┼─▶│  cache  │─────────▶│ rate_limit │              │
//!                         │  └────┬────┘          └─────┬──────┘              │
//!                         │       │ hit                 ▼                     │
//!                         │       │             ┌──────────────┐              │
//!                         │       │             │circuit_breaker│             │
//!                         │       │             └──────┬───────┘              │
//!                         │       │                    ▼                      │
//!                         │       │             ┌──────────────┐  ┌─────────┐ │
//!     JSON / ApiError     │       │             │   retries    │─▶│transport│─┼──▶ API
//!     ◀───────────────────┼───────┴─────────────└──────────────┘  └─────────┘ │
//!                         │                                                   │
//!                         │  Cross-cutting: config, clock, observability      │
//!                         └──────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod health;
pub mod observability;
pub mod resilience;
pub mod transport;

pub use client::{ClientError, ScholarClient};
pub use config::schema::ClientConfig;
pub use error::{ApiError, ApiResult, ErrorKind};
pub use health::HealthReport;
pub use transport::{ApiRequest, ApiSurface};
