//! Classified API errors.
//!
//! Every failure is classified once, where the raw HTTP outcome becomes an
//! [`ApiError`]. The `retryable` and `counts_toward_circuit` flags are fixed
//! by the constructor for each kind; the retry policy and circuit breaker
//! only read them.
//!
//! | Kind              | Retryable | Counts toward circuit |
//! |-------------------|-----------|-----------------------|
//! | `Connectivity`    | yes       | yes                   |
//! | `Server` (5xx)    | yes       | yes                   |
//! | `RateLimited`     | yes       | no                    |
//! | `NotFound`        | no        | no                    |
//! | `Authentication`  | no        | no                    |
//! | `Rejected` (4xx)  | no        | no                    |
//! | `InvalidResponse` | no        | no                    |
//! | `CircuitOpen`     | no        | no                    |

use std::time::Duration;

use thiserror::Error;

/// What went wrong, independent of retry/circuit policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network unreachable, connection refused, or timed out.
    Connectivity,
    /// Remote returned a 5xx status.
    Server { status: u16 },
    /// Remote returned 429, optionally with a `Retry-After` hint.
    RateLimited { retry_after: Option<Duration> },
    /// Remote returned 404.
    NotFound,
    /// Remote returned 401 or 403.
    Authentication { status: u16 },
    /// Any other 4xx status.
    Rejected { status: u16 },
    /// The response body could not be decoded.
    InvalidResponse,
    /// The circuit breaker denied admission; nothing was sent.
    CircuitOpen,
}

impl ErrorKind {
    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::Server { .. } => "server",
            ErrorKind::RateLimited { .. } => "rate_limited",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Authentication { .. } => "authentication",
            ErrorKind::Rejected { .. } => "rejected",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::CircuitOpen => "circuit_open",
        }
    }
}

/// A failure tagged with how the resilience layer must treat it.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    retryable: bool,
    counts_toward_circuit: bool,
}

/// Result type for orchestrated API calls.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn classified(
        kind: ErrorKind,
        message: impl Into<String>,
        retryable: bool,
        counts_toward_circuit: bool,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            counts_toward_circuit,
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::Connectivity, message, true, true)
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::Server { status }, message, true, true)
    }

    pub fn rate_limited(retry_after: Option<Duration>, message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::RateLimited { retry_after }, message, true, false)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::NotFound, message, false, false)
    }

    pub fn authentication(status: u16, message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::Authentication { status }, message, false, false)
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::Rejected { status }, message, false, false)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::InvalidResponse, message, false, false)
    }

    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::CircuitOpen, message, false, false)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the retry policy may attempt the call again.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Whether this failure is evidence of a remote outage.
    pub fn counts_toward_circuit(&self) -> bool {
        self.counts_toward_circuit
    }

    /// Server-provided delay for rate-limited responses.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.kind {
            ErrorKind::RateLimited { retry_after } => retry_after,
            _ => None,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        self.kind == ErrorKind::CircuitOpen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_failures_retry_and_count() {
        let err = ApiError::connectivity("connection refused");
        assert!(err.is_retryable());
        assert!(err.counts_toward_circuit());

        let err = ApiError::server(503, "unavailable");
        assert!(err.is_retryable());
        assert!(err.counts_toward_circuit());
        assert_eq!(err.kind(), &ErrorKind::Server { status: 503 });
    }

    #[test]
    fn test_rate_limited_retries_without_counting() {
        let err = ApiError::rate_limited(Some(Duration::from_secs(3)), "slow down");
        assert!(err.is_retryable());
        assert!(!err.counts_toward_circuit());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_client_errors_are_fatal() {
        for err in [
            ApiError::not_found("missing"),
            ApiError::authentication(403, "forbidden"),
            ApiError::rejected(400, "bad request"),
            ApiError::invalid_response("not json"),
            ApiError::circuit_open("open"),
        ] {
            assert!(!err.is_retryable(), "{:?}", err.kind());
            assert!(!err.counts_toward_circuit(), "{:?}", err.kind());
            assert_eq!(err.retry_after(), None);
        }
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::not_found("Resource not found: /paper/xyz");
        assert_eq!(err.to_string(), "Resource not found: /paper/xyz");
        assert_eq!(err.kind().label(), "not_found");
        assert!(ApiError::circuit_open("x").is_circuit_open());
    }
}
