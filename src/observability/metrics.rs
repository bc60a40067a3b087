//! Metrics collection and exposition.
//!
//! # Metrics
//! - `scholar_requests_total` (counter): logical requests by method, endpoint group, outcome
//! - `scholar_request_duration_seconds` (histogram): latency including waits and retries
//! - `scholar_cache_lookups_total` (counter): cache hits and misses
//! - `scholar_cache_entries` (gauge): current cache size
//! - `scholar_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `scholar_circuit_transitions_total` (counter): transitions by target state
//! - `scholar_retries_total` (counter): scheduled retries by error kind
//! - `scholar_rate_limit_wait_seconds` (histogram): time spent waiting for a credit
//!
//! Endpoint labels use the first path segment only (`/paper`, `/author`) to
//! keep cardinality bounded.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// First path segment of an endpoint, e.g. `/paper/abc/citations` → `/paper`.
pub fn endpoint_group(endpoint: &str) -> String {
    let segment = endpoint
        .trim_start_matches('/')
        .split(['/', '?'])
        .next()
        .unwrap_or_default();
    format!("/{}", segment)
}

pub fn record_request(
    method: &'static str,
    endpoint: &str,
    outcome: &'static str,
    elapsed: Duration,
) {
    let group = endpoint_group(endpoint);
    counter!(
        "scholar_requests_total",
        "method" => method,
        "endpoint" => group.clone(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "scholar_request_duration_seconds",
        "method" => method,
        "endpoint" => group
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("scholar_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("scholar_cache_entries").set(size as f64);
}

pub fn record_circuit_transition(to: CircuitState) {
    gauge!("scholar_circuit_state").set(match to {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    });
    counter!("scholar_circuit_transitions_total", "to" => to.as_str()).increment(1);
}

pub fn record_retry(kind: &'static str) {
    counter!("scholar_retries_total", "kind" => kind).increment(1);
}

pub fn record_rate_limit_wait(waited: Duration) {
    histogram!("scholar_rate_limit_wait_seconds").record(waited.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_group() {
        assert_eq!(endpoint_group("/paper/abc123/citations"), "/paper");
        assert_eq!(endpoint_group("/author/search"), "/author");
        assert_eq!(endpoint_group("papers/"), "/papers");
        assert_eq!(endpoint_group("/"), "/");
    }

    #[test]
    fn test_recorders_are_noops_without_exporter() {
        record_request("GET", "/paper/1", "ok", Duration::from_millis(5));
        record_cache_lookup(true);
        record_cache_size(3);
        record_circuit_transition(CircuitState::Open);
        record_retry("server");
        record_rate_limit_wait(Duration::from_millis(10));
    }
}
