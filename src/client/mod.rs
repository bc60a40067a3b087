//! Resilient API client.
//!
//! # Data Flow
//! ```text
//! get/post/execute(ApiRequest)
//!     → fingerprint → cache lookup (hit: return, nothing else runs)
//!     → token bucket acquire (may suspend)
//!     → circuit breaker call (open: fail fast)
//!         → retry policy execute
//!             → RequestExecutor::execute (one network attempt)
//!     → success: cache write-through
//!     → failure: classified error returned unchanged
//! ```
//!
//! # Design Decisions
//! - Cache hits spend no rate budget and carry no circuit risk
//! - The rate limiter runs before the breaker so waiting for a credit is
//!   never mistaken for an outage
//! - Every collaborator is owned by the client or injected; nothing is a
//!   process-wide singleton

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::{CacheStats, ResponseCache, TtlPolicy};
use crate::clock::{SharedClock, SystemClock};
use crate::config::{validate_config, ClientConfig, ConfigError};
use crate::error::ApiResult;
use crate::health::{CircuitReport, HealthReport, RateLimitReport};
use crate::observability::metrics;
use crate::resilience::{
    AuthTier, CircuitBreaker, CircuitState, RateLimitRegistry, RetryPolicy, TokenBucket,
};
use crate::transport::{
    ApiRequest, ApiSurface, HttpExecutor, HttpMethod, RequestExecutor, TransportError,
};

/// Errors constructing a [`ScholarClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Cached, rate-limited, circuit-protected client for one remote service.
pub struct ScholarClient {
    executor: Arc<dyn RequestExecutor>,
    cache: ResponseCache,
    cache_enabled: bool,
    ttl: TtlPolicy,
    tier: AuthTier,
    bucket: Arc<TokenBucket>,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    clock: SharedClock,
}

impl std::fmt::Debug for ScholarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScholarClient")
            .field("tier", &self.tier)
            .field("circuit", &self.breaker.state())
            .field("cache_entries", &self.cache.len())
            .finish()
    }
}

impl ScholarClient {
    /// Build a client that talks HTTP, with its own rate-limit buckets.
    ///
    /// The configuration is validated first.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        validate_config(config).map_err(ConfigError::Validation)?;
        let clock: SharedClock = Arc::new(SystemClock);
        let executor = Arc::new(HttpExecutor::new(&config.api)?);
        let registry = RateLimitRegistry::new(config.rate_limit.clone(), clock.clone());
        Ok(Self::with_parts(config, executor, &registry, clock))
    }

    /// Build a client from explicit collaborators.
    ///
    /// Clients built from the same `registry` share its buckets. The config
    /// is taken as-is; out-of-range timings degrade (never-refilling bucket,
    /// never-expiring entries) rather than fail.
    pub fn with_parts(
        config: &ClientConfig,
        executor: Arc<dyn RequestExecutor>,
        registry: &RateLimitRegistry,
        clock: SharedClock,
    ) -> Self {
        let tier = if config.api.has_api_key() {
            AuthTier::Authenticated
        } else {
            AuthTier::Shared
        };

        tracing::info!(
            tier = tier.as_str(),
            cache_enabled = config.cache.enabled,
            retries_enabled = config.retries.enabled,
            failure_threshold = config.circuit_breaker.failure_threshold,
            "Client configured"
        );

        Self {
            executor,
            cache: ResponseCache::new(config.cache.max_entries, clock.clone()),
            cache_enabled: config.cache.enabled,
            ttl: TtlPolicy::from_config(&config.cache),
            tier,
            bucket: registry.bucket(tier),
            breaker: CircuitBreaker::new(config.circuit_breaker.clone(), clock.clone()),
            retry: RetryPolicy::new(config.retries.clone(), clock.clone()),
            clock,
        }
    }

    /// GET against the Graph API.
    pub async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> ApiResult<Value> {
        self.execute(ApiRequest::get(endpoint).params(params.iter().copied()))
            .await
    }

    /// POST against the Graph API.
    pub async fn post(
        &self,
        endpoint: &str,
        body: Value,
        params: &[(&str, &str)],
    ) -> ApiResult<Value> {
        self.execute(ApiRequest::post(endpoint, body).params(params.iter().copied()))
            .await
    }

    /// GET against the Recommendations API.
    pub async fn get_recommendations(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> ApiResult<Value> {
        let request = ApiRequest::get(endpoint)
            .on(ApiSurface::Recommendations)
            .params(params.iter().copied());
        self.execute(request).await
    }

    /// POST against the Recommendations API.
    pub async fn post_recommendations(
        &self,
        endpoint: &str,
        body: Value,
        params: &[(&str, &str)],
    ) -> ApiResult<Value> {
        let request = ApiRequest::post(endpoint, body)
            .on(ApiSurface::Recommendations)
            .params(params.iter().copied());
        self.execute(request).await
    }

    /// Run one logical request through cache, rate limiter, breaker and retries.
    pub async fn execute(&self, request: ApiRequest) -> ApiResult<Value> {
        let span = tracing::info_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = request.method.as_str(),
            endpoint = %request.endpoint,
        );
        self.execute_inner(request).instrument(span).await
    }

    async fn execute_inner(&self, request: ApiRequest) -> ApiResult<Value> {
        let start = self.clock.now();
        let method = request.method.as_str();

        let key = self.is_cacheable(&request).then(|| request.fingerprint());
        if let Some(key) = &key {
            if let Some(value) = self.cache.get(key) {
                let elapsed = self.clock.now() - start;
                metrics::record_request(method, &request.endpoint, "cache_hit", elapsed);
                return Ok(value);
            }
        }

        self.bucket.acquire().await;

        let result = self
            .breaker
            .call(|| {
                self.retry.execute(|attempt| {
                    tracing::debug!(attempt, "Sending request");
                    self.executor.execute(&request)
                })
            })
            .await;

        let elapsed = self.clock.now() - start;
        match result {
            Ok(value) => {
                if let Some(key) = key {
                    self.cache
                        .set(key, value.clone(), self.ttl.ttl_for(&request.endpoint));
                }
                metrics::record_request(method, &request.endpoint, "success", elapsed);
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(kind = err.kind().label(), error = %err, "Request failed");
                metrics::record_request(method, &request.endpoint, err.kind().label(), elapsed);
                Err(err)
            }
        }
    }

    fn is_cacheable(&self, request: &ApiRequest) -> bool {
        self.cache_enabled
            && match request.method {
                HttpMethod::Get => true,
                HttpMethod::Post => self.ttl.post_cacheable(&request.endpoint),
            }
    }

    /// Drop cached responses whose endpoint contains `pattern`.
    pub fn invalidate_cache(&self, pattern: &str) -> usize {
        self.cache.invalidate(pattern)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn reset_circuit(&self) {
        self.breaker.reset();
    }

    pub fn available_tokens(&self) -> f64 {
        self.bucket.available_tokens()
    }

    pub fn auth_tier(&self) -> AuthTier {
        self.tier
    }

    pub fn health(&self) -> HealthReport {
        let state = self.breaker.state();
        HealthReport {
            status: state.into(),
            circuit: CircuitReport {
                state,
                failure_count: self.breaker.failure_count(),
                failure_threshold: self.breaker.config().failure_threshold,
            },
            cache: self.cache.stats(),
            rate_limit: RateLimitReport {
                tier: self.tier.as_str(),
                available_tokens: self.bucket.available_tokens(),
                capacity: self.bucket.capacity(),
                rate_per_second: self.bucket.rate(),
            },
        }
    }
}
