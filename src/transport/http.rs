//! reqwest-backed executor and HTTP outcome classification.

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use serde_json::Value;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::transport::{ApiRequest, ApiSurface, HttpMethod, RequestExecutor};

/// Errors building the HTTP client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("API key is not a valid header value")]
    InvalidApiKey(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Executes requests against the Graph and Recommendations APIs.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    graph_base_url: String,
    recommendations_base_url: String,
    large_response_threshold: usize,
}

impl HttpExecutor {
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key() {
            let mut value = HeaderValue::from_str(key)?;
            value.set_sensitive(true);
            headers.insert("x-api-key", value);
        }

        if config.disable_ssl_verify {
            tracing::warn!("TLS certificate verification is disabled");
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.disable_ssl_verify)
            .build()?;

        Ok(Self {
            client,
            graph_base_url: config.graph_base_url.trim_end_matches('/').to_string(),
            recommendations_base_url: config
                .recommendations_base_url
                .trim_end_matches('/')
                .to_string(),
            large_response_threshold: config.large_response_threshold,
        })
    }

    fn url_for(&self, request: &ApiRequest) -> String {
        let base = match request.surface {
            ApiSurface::Graph => &self.graph_base_url,
            ApiSurface::Recommendations => &self.recommendations_base_url,
        };
        format!("{}{}", base, request.endpoint)
    }

    async fn send(&self, request: &ApiRequest) -> ApiResult<Value> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        tracing::info!(
            method = request.method.as_str(),
            endpoint = %request.endpoint,
            params = ?request.params,
            "API request"
        );

        let mut builder = self.client.request(method, self.url_for(request));
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify_transport_error)?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        tracing::info!(
            method = request.method.as_str(),
            endpoint = %request.endpoint,
            status,
            "API response"
        );

        let bytes = response.bytes().await.map_err(classify_transport_error)?;
        if bytes.len() > self.large_response_threshold {
            tracing::warn!(
                endpoint = %request.endpoint,
                bytes = bytes.len(),
                threshold = self.large_response_threshold,
                "Large API response"
            );
        }

        if let Some(err) = classify_status(status, retry_after, &request.endpoint, &bytes) {
            return Err(err);
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::invalid_response(format!(
                "Response from {} is not valid JSON: {}",
                request.endpoint, e
            ))
        })
    }
}

impl RequestExecutor for HttpExecutor {
    fn execute<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, ApiResult<Value>> {
        Box::pin(self.send(request))
    }
}

/// Map a non-success status to a classified error.
pub fn classify_status(
    status: u16,
    retry_after: Option<Duration>,
    endpoint: &str,
    body: &[u8],
) -> Option<ApiError> {
    let err = match status {
        200..=399 => return None,
        429 => ApiError::rate_limited(
            retry_after,
            "Rate limit exceeded. The API allows 5,000 requests per 5 minutes for \
             unauthenticated requests. Consider using an API key for higher limits, \
             or wait before retrying.",
        ),
        404 => ApiError::not_found(format!(
            "Resource not found: {}. The requested paper, author, or other resource \
             does not exist. Please verify the ID is correct.",
            endpoint
        )),
        401 | 403 => ApiError::authentication(
            status,
            format!(
                "Authentication failed with status {}. Check SEMANTIC_SCHOLAR_API_KEY.",
                status
            ),
        ),
        500..=599 => ApiError::server(
            status,
            format!(
                "API request failed with status {}: {}",
                status,
                String::from_utf8_lossy(body)
            ),
        ),
        _ => ApiError::rejected(
            status,
            format!(
                "API request failed with status {}: {}",
                status,
                String::from_utf8_lossy(body)
            ),
        ),
    };
    Some(err)
}

/// `Retry-After` as delay-seconds. HTTP-date values and zero are ignored.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|delay| !delay.is_zero())
}

fn classify_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::connectivity(format!("Request timed out: {}", e))
    } else if e.is_decode() {
        ApiError::invalid_response(format!("Failed to read response body: {}", e))
    } else if e.is_builder() {
        ApiError::rejected(0, format!("Invalid request: {}", e))
    } else {
        ApiError::connectivity(format!("Failed to connect to API: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(200, None, "/paper/x", b"{}").is_none());

        let err = classify_status(429, Some(Duration::from_secs(2)), "/paper/x", b"").unwrap();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert!(err.is_retryable() && !err.counts_toward_circuit());

        let err = classify_status(404, None, "/paper/x", b"").unwrap();
        assert_eq!(err.kind(), &ErrorKind::NotFound);
        assert!(err.message().contains("/paper/x"));

        let err = classify_status(403, None, "/paper/x", b"").unwrap();
        assert_eq!(err.kind(), &ErrorKind::Authentication { status: 403 });

        let err = classify_status(503, None, "/paper/x", b"maintenance").unwrap();
        assert!(err.counts_toward_circuit());
        assert!(err.message().ends_with("maintenance"));

        let err = classify_status(400, None, "/paper/x", b"bad fields").unwrap();
        assert_eq!(err.kind(), &ErrorKind::Rejected { status: 400 });
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(" 1.5 "), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("0"), None);
        assert_eq!(parse_retry_after("0.0"), None);
        assert!(parse_retry_after("1.8e19").is_some());
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_url_for_surface() {
        let config = ApiConfig {
            graph_base_url: "http://localhost:1/graph/v1/".into(),
            recommendations_base_url: "http://localhost:1/recommendations/v1".into(),
            ..ApiConfig::default()
        };
        let executor = HttpExecutor::new(&config).unwrap();
        assert_eq!(
            executor.url_for(&ApiRequest::get("/paper/abc")),
            "http://localhost:1/graph/v1/paper/abc"
        );
        let recommendations =
            ApiRequest::get("/papers/forpaper/abc").on(ApiSurface::Recommendations);
        assert_eq!(
            executor.url_for(&recommendations),
            "http://localhost:1/recommendations/v1/papers/forpaper/abc"
        );
    }
}
