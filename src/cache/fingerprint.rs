//! Request fingerprints used as cache keys.
//!
//! Two requests share a fingerprint when they hit the same endpoint on the
//! same API surface with the same method, query parameters (in any order)
//! and body. Bodies are folded in through `serde_json`'s canonical
//! serialization, whose object maps keep keys sorted.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    scope: String,
    method: String,
    endpoint: String,
    params: Vec<(String, String)>,
    body: Option<String>,
}

impl Fingerprint {
    pub fn new(method: &str, endpoint: &str) -> Self {
        Self {
            scope: String::new(),
            method: method.to_ascii_uppercase(),
            endpoint: endpoint.to_string(),
            params: Vec::new(),
            body: None,
        }
    }

    /// Namespace the key, e.g. by API surface.
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    /// Fold query parameters into the key. Order does not matter.
    pub fn with_params<'a, I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.params = params
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.params.sort();
        self
    }

    /// Fold a request body into the key.
    pub fn with_body(mut self, body: &serde_json::Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scope.is_empty() {
            write!(f, "[{}] ", self.scope)?;
        }
        write!(f, "{} {}", self.method, self.endpoint)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, k, v)?;
        }
        if let Some(body) = &self.body {
            write!(f, " {}", body)?;
        }
        Ok(())
    }
}
