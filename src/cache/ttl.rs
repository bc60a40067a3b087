//! Cache lifetime and cacheability rules by endpoint shape.

use std::time::Duration;

use crate::config::CacheConfig;

/// Coarse classification of an endpoint path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointShape {
    /// A single immutable record, e.g. `/paper/{id}` or `/author/{id}`.
    Detail,
    /// Search results or a record's related listings, which change often.
    Listing,
    Other,
}

const RECORD_RESOURCES: &[&str] = &["paper", "author"];
const QUERY_SEGMENTS: &[&str] = &["search", "autocomplete", "match", "batch"];
const LISTING_SUFFIXES: &[&str] = &["citations", "references", "papers", "authors"];

impl EndpointShape {
    pub fn of(endpoint: &str) -> Self {
        let path = endpoint.split('?').next().unwrap_or(endpoint);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if segments.iter().any(|s| QUERY_SEGMENTS.contains(s)) {
            return if segments.contains(&"batch") {
                EndpointShape::Other
            } else {
                EndpointShape::Listing
            };
        }

        match segments.as_slice() {
            [resource, _id] if RECORD_RESOURCES.contains(resource) => EndpointShape::Detail,
            [resource, _id, sub]
                if RECORD_RESOURCES.contains(resource) && LISTING_SUFFIXES.contains(sub) =>
            {
                EndpointShape::Listing
            }
            _ => EndpointShape::Other,
        }
    }
}

/// TTL and cacheability decisions derived from [`CacheConfig`].
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    default_ttl: Duration,
    detail_ttl: Duration,
    search_ttl: Duration,
    cacheable_posts: Vec<String>,
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            default_ttl: Duration::from_secs(config.default_ttl_secs),
            detail_ttl: Duration::from_secs(config.detail_ttl_secs),
            search_ttl: Duration::from_secs(config.search_ttl_secs),
            cacheable_posts: config
                .cacheable_post_endpoints
                .iter()
                .map(|e| normalize(e).to_string())
                .collect(),
        }
    }

    pub fn ttl_for(&self, endpoint: &str) -> Duration {
        match EndpointShape::of(endpoint) {
            EndpointShape::Detail => self.detail_ttl,
            EndpointShape::Listing => self.search_ttl,
            EndpointShape::Other => self.default_ttl,
        }
    }

    /// Whether a POST to `endpoint` is a read-only query that may be cached.
    pub fn post_cacheable(&self, endpoint: &str) -> bool {
        let endpoint = normalize(endpoint);
        self.cacheable_posts.iter().any(|allowed| allowed == endpoint)
    }
}

fn normalize(endpoint: &str) -> &str {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
