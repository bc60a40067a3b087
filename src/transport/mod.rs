//! Request executor seam.
//!
//! # Data Flow
//! ```text
//! ScholarClient
//!     → RequestExecutor::execute(&ApiRequest)
//!     → http.rs (reqwest call, status classification)
//!     → Ok(JSON) | Err(classified ApiError)
//! ```
//!
//! # Design Decisions
//! - Raw HTTP outcomes are classified here and nowhere else
//! - The trait lets tests swap the network for scripted responses

pub mod http;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::cache::Fingerprint;
use crate::error::ApiResult;

pub use http::{HttpExecutor, TransportError};

/// HTTP method of a logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Which base URL a request is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiSurface {
    #[default]
    Graph,
    Recommendations,
}

impl ApiSurface {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiSurface::Graph => "graph",
            ApiSurface::Recommendations => "recommendations",
        }
    }
}

/// A single logical API request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub surface: ApiSurface,
    /// Path relative to the surface's base URL, e.g. `/paper/search`.
    pub endpoint: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            surface: ApiSurface::Graph,
            endpoint: endpoint.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body),
            ..Self::get(endpoint)
        }
    }

    pub fn on(mut self, surface: ApiSurface) -> Self {
        self.surface = surface;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Cache key for this request.
    pub fn fingerprint(&self) -> Fingerprint {
        let fingerprint = Fingerprint::new(self.method.as_str(), &self.endpoint)
            .with_scope(self.surface.as_str())
            .with_params(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        match &self.body {
            Some(body) => fingerprint.with_body(body),
            None => fingerprint,
        }
    }
}

/// Performs one network attempt for a request.
pub trait RequestExecutor: Send + Sync {
    fn execute<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, ApiResult<Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::get("/paper/search")
            .param("query", "attention")
            .params([("limit", "5")]);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.surface, ApiSurface::Graph);
        assert_eq!(req.params.len(), 2);
        assert!(req.body.is_none());

        let req = ApiRequest::post("/papers/", json!({"positivePaperIds": ["1"]}))
            .on(ApiSurface::Recommendations);
        assert_eq!(req.method.as_str(), "POST");
        assert_eq!(req.surface.as_str(), "recommendations");
    }

    #[test]
    fn test_fingerprint_includes_surface_and_body() {
        let body = json!({"positivePaperIds": ["1"]});
        let graph = ApiRequest::post("/papers/", body.clone());
        let recs = ApiRequest::post("/papers/", body).on(ApiSurface::Recommendations);
        assert_ne!(graph.fingerprint(), recs.fingerprint());
        assert_eq!(recs.fingerprint(), recs.clone().fingerprint());
        assert_eq!(recs.fingerprint().endpoint(), "/papers/");
    }
}
