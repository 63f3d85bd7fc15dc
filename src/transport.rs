//! The wire underneath the HTTP client.
//!
//! [`Transport`] moves one fully built (and already signed) request to the control
//! plane and returns the raw status and body. Production uses [`ReqwestTransport`];
//! tests wrap a `tower::service_fn` in [`ServiceTransport`] to fake the control plane.

use crate::error::{ApiError, BoxError};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::fmt;
use std::time::Duration;
use tower::{Service, ServiceExt};
use url::Url;

/// Default total timeout for one request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// An outgoing request.
///
/// `opaque` carries an explicit request target (`//host/path`) for callers that sign a
/// path other than the one in `url`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub opaque: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, opaque: None, headers: HeaderMap::new(), body: None }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Path plus query, as the server sees it.
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(q) => format!("{}?{}", self.url.path(), q),
            None => self.url.path().to_string(),
        }
    }

    /// Body decoded as JSON, `Value::Null` if absent or not JSON.
    pub fn json_body(&self) -> serde_json::Value {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Raw response: status plus the full body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self { status, body: value.to_string().into_bytes() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request. Implementations must be safe for concurrent use.
///
/// Failures that never produced a response are reported as transport errors (`code == 0`).
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `reqwest` engine with a total per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder =
            self.client.request(request.method, request.url).headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await.map_err(ApiError::transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(ApiError::transport)?;
        Ok(HttpResponse { status, body: body.to_vec() })
    }
}

/// Adapts any `tower::Service<HttpRequest>` into a [`Transport`].
///
/// ```rust
/// use automq_reconciler::transport::{HttpRequest, HttpResponse, ServiceTransport};
/// use tower::service_fn;
///
/// let fake = ServiceTransport::new(service_fn(|_req: HttpRequest| async {
///     Ok::<_, std::convert::Infallible>(HttpResponse::new(200, "{}"))
/// }));
/// # let _ = fake;
/// ```
#[derive(Clone)]
pub struct ServiceTransport<S> {
    service: S,
}

impl<S> ServiceTransport<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S> fmt::Debug for ServiceTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> Transport for ServiceTransport<S>
where
    S: Service<HttpRequest, Response = HttpResponse> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
{
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.service.clone().oneshot(request).await.map_err(|e| {
            let err: BoxError = e.into();
            ApiError { code: 0, message: err.to_string(), source: Some(err) }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::service_fn;

    #[tokio::test]
    async fn service_transport_forwards_requests() {
        let transport = ServiceTransport::new(service_fn(|req: HttpRequest| async move {
            Ok::<_, Infallible>(HttpResponse::new(200, req.path_and_query()))
        }));
        let req = HttpRequest::new(
            Method::GET,
            "https://cp.example.com/api/v1/instances?page=1".parse().unwrap(),
        );
        let resp = transport.send(req).await.unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.body, b"/api/v1/instances?page=1");
    }

    #[tokio::test]
    async fn service_errors_become_transport_errors() {
        let transport = ServiceTransport::new(service_fn(|_req: HttpRequest| async {
            Err::<HttpResponse, _>(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"))
        }));
        let req = HttpRequest::new(Method::GET, "https://cp.example.com/".parse().unwrap());
        let err = transport.send(req).await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.message.contains("slow"));
    }

    #[test]
    fn json_body_tolerates_missing_or_invalid() {
        let req = HttpRequest::new(Method::POST, "https://cp.example.com/".parse().unwrap());
        assert!(req.json_body().is_null());
        let req = req.with_body(br#"{"partition":6}"#.to_vec());
        assert_eq!(req.json_body()["partition"], 6);
    }
}
