//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! constraints. All problems are reported at once, not just the first.

use std::fmt;

use crate::config::schema::ClientConfig;

/// Slowest accepted refill rate. Anything lower waits for hours per call.
pub const MIN_RATE_PER_SECOND: f64 = 0.001;

/// Longest accepted cache TTL (30 days).
pub const MAX_TTL_SECS: u64 = 30 * 24 * 3600;

/// Longest accepted retry delay (one hour).
pub const MAX_RETRY_DELAY_MS: u64 = 3_600_000;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("api.graph_base_url", &config.api.graph_base_url),
        ("api.recommendations_base_url", &config.api.recommendations_base_url),
    ] {
        if let Err(e) = url::Url::parse(value) {
            errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
        }
    }
    if config.api.timeout_secs == 0 {
        errors.push(ValidationError::new("api.timeout_secs", "must be greater than 0"));
    }

    let rl = &config.rate_limit;
    for (field, rate) in [
        ("rate_limit.authenticated_rps", rl.authenticated_rps),
        ("rate_limit.shared_rps", rl.shared_rps),
    ] {
        if !(rate.is_finite() && rate >= MIN_RATE_PER_SECOND) {
            errors.push(ValidationError::new(
                field,
                format!("must be a finite rate of at least {}", MIN_RATE_PER_SECOND),
            ));
        }
    }
    if rl.authenticated_burst == 0 {
        errors.push(ValidationError::new("rate_limit.authenticated_burst", "must be at least 1"));
    }
    if rl.shared_burst == 0 {
        errors.push(ValidationError::new("rate_limit.shared_burst", "must be at least 1"));
    }

    let cb = &config.circuit_breaker;
    if cb.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_threshold",
            "must be at least 1",
        ));
    }
    if !(cb.recovery_timeout_secs.is_finite() && cb.recovery_timeout_secs >= 0.0) {
        errors.push(ValidationError::new(
            "circuit_breaker.recovery_timeout_secs",
            "must be a non-negative number",
        ));
    }
    if cb.half_open_max_calls == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.half_open_max_calls",
            "must be at least 1",
        ));
    }

    let cache = &config.cache;
    if cache.max_entries == 0 {
        errors.push(ValidationError::new("cache.max_entries", "must be at least 1"));
    }
    for (field, ttl) in [
        ("cache.default_ttl_secs", cache.default_ttl_secs),
        ("cache.detail_ttl_secs", cache.detail_ttl_secs),
        ("cache.search_ttl_secs", cache.search_ttl_secs),
    ] {
        if ttl > MAX_TTL_SECS {
            errors.push(ValidationError::new(
                field,
                format!("must be at most {} seconds", MAX_TTL_SECS),
            ));
        }
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            format!(
                "base delay {}ms exceeds max delay {}ms",
                retries.base_delay_ms, retries.max_delay_ms
            ),
        ));
    }
    if retries.max_delay_ms > MAX_RETRY_DELAY_MS {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            format!("must be at most {}ms", MAX_RETRY_DELAY_MS),
        ));
    }
    if !(0.0..=1.0).contains(&retries.jitter_ratio) {
        errors.push(ValidationError::new("retries.jitter_ratio", "must be between 0 and 1"));
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}', expected 'pretty' or 'json'", other),
        )),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
