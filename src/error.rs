//! Error types shared by every layer of the reconciler.
//!
//! The HTTP layer never recovers from anything: non-2xx responses and transport
//! failures both surface as [`ApiError`]. Controllers recover only the not-found
//! case, and the waiter additionally tolerates transport failures while polling.
use std::fmt;
use std::time::Duration;

/// Boxed error used for underlying causes we only carry for display/chaining.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure reported by the control plane (or by the transport underneath it).
///
/// `code` is the HTTP status; `0` means the request never produced a response.
#[derive(Debug)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    pub source: Option<BoxError>,
}

impl ApiError {
    /// Error for a non-2xx response. The body is surfaced verbatim.
    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self { code, message: body.into(), source: None }
    }

    /// Error for a request that never reached the server (connect, timeout, TLS...).
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self { code: 0, message: err.to_string(), source: Some(Box::new(err)) }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }

    /// 5xx: the control plane is busy or failing, not rejecting the request.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.code)
    }

    pub fn is_transport(&self) -> bool {
        self.code == 0
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code == 0 {
            write!(f, "transport error: {}", self.message)
        } else {
            write!(f, "HTTP {}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unified error type returned by the API surface, the waiter and the controllers.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The resource does not exist (404, or an empty filtered lookup).
    #[error("{what} not found")]
    NotFound {
        /// Human readable identifier of the missing resource.
        what: String,
    },
    /// Client-side rejection before any request was issued.
    #[error("{0}")]
    Validation(String),
    /// The control plane returned a non-2xx status, or the transport failed.
    #[error("{operation}: {source}")]
    Api {
        /// Operation attempted, including the resource identifier.
        operation: String,
        #[source]
        source: ApiError,
    },
    /// A 2xx body could not be decoded.
    #[error("{operation}: failed to decode response: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },
    /// The waiter observed a terminal error state.
    #[error("{resource} status is {state}")]
    WaitFailed { resource: String, state: String },
    /// The waiter observed a state outside of its pending/target sets.
    #[error("{resource} entered unexpected state {state} (expected one of {expected})")]
    UnexpectedState { resource: String, state: String, expected: String },
    /// The waiter ran out of time.
    #[error("timeout after {timeout:?} waiting for {resource} (last state: {last_state})")]
    WaitTimeout { resource: String, timeout: Duration, last_state: String },
    /// The reconciliation context was cancelled at a suspension point.
    #[error("{operation} cancelled")]
    Cancelled { operation: String },
    /// The host state sink refused a write.
    #[error("failed to persist state: {0}")]
    State(String),
    /// Provider configuration was incomplete or invalid.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    /// The request could not be signed.
    #[error(transparent)]
    Sign(#[from] crate::signer::SignError),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound { what: what.into() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn api(operation: impl Into<String>, source: ApiError) -> Self {
        Error::Api { operation: operation.into(), source }
    }

    /// True for HTTP 404 and for empty composite lookups.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Api { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Transport failures and 5xx responses may be retried by callers that poll (the waiter).
    /// 4xx responses other than 404 are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Api { source, .. } if source.is_transport() || source.is_server_error())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Replace the low-level operation label (`GET /path`) with a descriptive one.
    pub fn relabel(self, operation: impl Into<String>) -> Self {
        match self {
            Error::Api { source, .. } => Error::Api { operation: operation.into(), source },
            Error::Decode { source, .. } => Error::Decode { operation: operation.into(), source },
            Error::Cancelled { .. } => Error::Cancelled { operation: operation.into() },
            other => other,
        }
    }

    /// HTTP status carried by an API failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { source, .. } => Some(source.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn status_error_display_includes_body() {
        let err = ApiError::status(409, "{\"code\":\"Conflict\"}");
        let msg = err.to_string();
        assert!(msg.contains("409"));
        assert!(msg.contains("Conflict"));
        assert!(!err.is_transport());
    }

    #[test]
    fn transport_error_has_code_zero_and_source() {
        let err = ApiError::transport(io::Error::new(io::ErrorKind::TimedOut, "deadline"));
        assert_eq!(err.code, 0);
        assert!(err.is_transport());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("deadline"));
    }

    #[test]
    fn not_found_covers_404_and_empty_lookups() {
        let http = Error::api("read topic t-1", ApiError::status(404, "missing"));
        assert!(http.is_not_found());
        assert_eq!(http.status_code(), Some(404));
        assert!(Error::not_found("user alice").is_not_found());
        let server = Error::api("read topic t-1", ApiError::status(500, "boom"));
        assert!(!server.is_not_found());
    }

    #[test]
    fn transport_and_server_failures_are_retryable() {
        let transport = Error::api(
            "get instance",
            ApiError::transport(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        );
        assert!(transport.is_retryable());
        assert!(Error::api("get instance", ApiError::status(503, "busy")).is_retryable());
        assert!(Error::api("get instance", ApiError::status(500, "boom")).is_retryable());
        assert!(!Error::api("get instance", ApiError::status(400, "bad")).is_retryable());
        assert!(!Error::api("get instance", ApiError::status(403, "denied")).is_retryable());
        assert!(!Error::validation("nope").is_retryable());
    }

    #[test]
    fn relabel_keeps_source() {
        let err = Error::api("GET /api/v1/instances/kf-1", ApiError::status(500, "boom"))
            .relabel("read kafka instance kf-1");
        assert_eq!(err.to_string(), "read kafka instance kf-1: HTTP 500: boom");
        let untouched = Error::validation("bad").relabel("ignored");
        assert_eq!(untouched.to_string(), "bad");
    }

    #[test]
    fn api_error_display_names_operation() {
        let err = Error::api("delete kafka instance kf-1", ApiError::status(500, "internal"));
        let msg = err.to_string();
        assert!(msg.starts_with("delete kafka instance kf-1"));
        assert!(msg.contains("internal"));
    }
}
