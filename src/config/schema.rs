//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the API client.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote API endpoints and credentials.
    pub api: ApiConfig,

    /// Token bucket settings per auth tier.
    pub rate_limit: RateLimitConfig,

    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Remote API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL for the Graph API.
    pub graph_base_url: String,

    /// Base URL for the Recommendations API.
    pub recommendations_base_url: String,

    /// Optional API key, sent as `x-api-key`.
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Skip TLS certificate verification (corporate proxies).
    pub disable_ssl_verify: bool,

    /// Responses larger than this many bytes are logged as a warning.
    pub large_response_threshold: usize,

    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            graph_base_url: "https://api.semanticscholar.org/graph/v1".to_string(),
            recommendations_base_url: "https://api.semanticscholar.org/recommendations/v1"
                .to_string(),
            api_key: None,
            timeout_secs: 30,
            disable_ssl_verify: false,
            large_response_threshold: 50_000,
            user_agent: concat!("scholar-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ApiConfig {
    /// The configured key, trimmed; blank keys count as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Token bucket configuration.
///
/// An authenticated caller gets a dedicated low-rate bucket. Unauthenticated
/// callers share one bucket sized below the public pool's limit
/// (5,000 requests per 5 minutes) to leave headroom for other users.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained credits per second with an API key.
    pub authenticated_rps: f64,

    /// Burst capacity with an API key.
    pub authenticated_burst: u32,

    /// Sustained credits per second for the shared pool.
    pub shared_rps: f64,

    /// Burst capacity for the shared pool.
    pub shared_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            authenticated_rps: 1.0,
            authenticated_burst: 1,
            shared_rps: 15.0,
            shared_burst: 10,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive counted failures that open the circuit.
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before admitting a trial call.
    pub recovery_timeout_secs: f64,

    /// Trial calls admitted while half-open.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 30.0,
            half_open_max_calls: 1,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.recovery_timeout_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable response caching.
    pub enabled: bool,

    /// Maximum number of cached responses.
    pub max_entries: usize,

    /// TTL for endpoints that are neither detail lookups nor listings.
    pub default_ttl_secs: u64,

    /// TTL for per-item detail lookups (e.g. `/paper/{id}`).
    pub detail_ttl_secs: u64,

    /// TTL for search and listing queries.
    pub search_ttl_secs: u64,

    /// POST endpoints that are read-only and may be cached.
    pub cacheable_post_endpoints: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            default_ttl_secs: 300,
            detail_ttl_secs: 3600,
            search_ttl_secs: 300,
            cacheable_post_endpoints: vec!["/papers/".to_string()],
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries. When disabled every call gets a single attempt.
    pub enabled: bool,

    /// Maximum number of attempts, the first call included.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Upper bound of random jitter as a fraction of the delay.
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            jitter_ratio: 0.1,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.recovery_timeout(), Duration::from_secs(30));
        assert_eq!(config.cache.default_ttl_secs, 300);
        assert_eq!(config.cache.detail_ttl_secs, 3600);
        assert_eq!(config.retries.max_attempts, 5);
        assert!(config.retries.enabled);
        assert!(!config.api.has_api_key());
        assert!(!config.api.disable_ssl_verify);
    }

    #[test]
    fn test_api_key_is_trimmed() {
        let mut api = ApiConfig {
            api_key: Some("  my-api-key\n".to_string()),
            ..Default::default()
        };
        assert_eq!(api.api_key(), Some("my-api-key"));

        api.api_key = Some(" \t ".to_string());
        assert_eq!(api.api_key(), None);
        assert!(!api.has_api_key());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [circuit_breaker]
            failure_threshold = 2

            [cache]
            max_entries = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.circuit_breaker.failure_threshold, 2);
        assert_eq!(config.circuit_breaker.half_open_max_calls, 1);
        assert_eq!(config.cache.max_entries, 10);
        assert_eq!(config.cache.search_ttl_secs, 300);
        assert_eq!(config.rate_limit, RateLimitConfig::default());
    }
}
