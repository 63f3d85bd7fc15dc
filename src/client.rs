//! HTTP client for the control plane.
//!
//! Builds a request from a path, attaches JSON and authentication (a static token
//! or an `AUTOMQ-HMAC-SHA256` signature), sends it through a [`Transport`] and
//! classifies the response. There is no retry here.

use crate::error::{ApiError, Error, Result};
use crate::signer::Signer;
use crate::telemetry::{ReconcileEvent, RequestEvent, Telemetry};
use crate::transport::{HttpRequest, Transport};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Header carrying the environment a request is scoped to.
pub const ENVIRONMENT_HEADER: &str = "x-automq-environment-id";

/// Per-reconciliation context: cancellation plus the environment id.
///
/// Cloning shares the cancellation token.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    environment_id: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_environment(mut self, environment_id: impl Into<String>) -> Self {
        let env = environment_id.into();
        self.environment_id = if env.is_empty() { None } else { Some(env) };
        self
    }

    pub fn environment_id(&self) -> Option<&str> {
        self.environment_id.as_deref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the reconciliation is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// How requests authenticate.
#[derive(Debug, Clone)]
pub enum Auth {
    /// Sent verbatim as the `Authorization` header.
    Token(String),
    /// Signed per request for the given scope.
    Signed { signer: Signer, region: String, service: String },
}

/// Control-plane client. Cheap to clone; clones share the transport.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base: Url,
    auth: Auth,
    transport: Arc<dyn Transport>,
    telemetry: Telemetry,
}

impl HttpClient {
    pub fn new(base: Url, auth: Auth, transport: Arc<dyn Transport>) -> Self {
        Self { base, auth, transport, telemetry: Telemetry::default() }
    }

    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<u8>> {
        self.execute(ctx, Method::GET, path, query, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: &B,
    ) -> Result<Vec<u8>> {
        let body = encode(&Method::POST, path, body)?;
        self.execute(ctx, Method::POST, path, &[], Some(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>> {
        let body = body.map(|b| encode(&Method::PATCH, path, b)).transpose()?;
        self.execute(ctx, Method::PATCH, path, &[], body).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: &B,
    ) -> Result<Vec<u8>> {
        let body = encode(&Method::PUT, path, body)?;
        self.execute(ctx, Method::PUT, path, &[], Some(body)).await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<u8>> {
        self.execute(ctx, Method::DELETE, path, query, None).await
    }

    /// Build, authenticate, send and classify one request.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let operation = format!("{} {}", method, path);
        if ctx.is_cancelled() {
            return Err(Error::Cancelled { operation });
        }

        let request = self.build(ctx, method.clone(), path, query, body)?;
        tracing::debug!(method = %method, path = %path, "control plane request");

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(Error::Cancelled { operation }),
            res = self.transport.send(request) => res,
        };
        let duration = started.elapsed();

        let (status, result) = match outcome {
            Ok(resp) if resp.is_success() => (resp.status, Ok(resp.body)),
            Ok(resp) => {
                let message = String::from_utf8_lossy(&resp.body).into_owned();
                (resp.status, Err(Error::api(operation, ApiError::status(resp.status, message))))
            }
            Err(err) => (0, Err(Error::api(operation, err))),
        };

        let event = match &result {
            Ok(_) => RequestEvent::Completed {
                method: method.to_string(),
                path: path.to_string(),
                status,
                duration,
            },
            Err(err) => {
                tracing::debug!(method = %method, path = %path, status, error = %err, "control plane request failed");
                RequestEvent::Failed {
                    method: method.to_string(),
                    path: path.to_string(),
                    status,
                    duration,
                }
            }
        };
        self.telemetry.emit(ReconcileEvent::Request(event)).await;
        result
    }

    fn build(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<HttpRequest> {
        let mut url = self.base.join(path.trim_start_matches('/')).map_err(|e| {
            Error::validation(format!("invalid request path {}: {}", path, e))
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }

        let mut request = HttpRequest::new(method, url);
        request.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(env) = ctx.environment_id() {
            let value = HeaderValue::from_str(env)
                .map_err(|e| Error::validation(format!("invalid environment id {}: {}", env, e)))?;
            request.headers.insert(HeaderName::from_static(ENVIRONMENT_HEADER), value);
        }
        request.body = body;

        match &self.auth {
            Auth::Token(token) => {
                let value = HeaderValue::from_str(token)
                    .map_err(|e| Error::validation(format!("invalid token: {}", e)))?;
                request.headers.insert(AUTHORIZATION, value);
            }
            Auth::Signed { signer, region, service } => {
                let payload = request.body.clone();
                match payload {
                    Some(bytes) => {
                        let mut cursor = Cursor::new(bytes);
                        signer.sign(&mut request, Some(&mut cursor), service, region)?;
                    }
                    None => {
                        signer.sign(&mut request, None, service, region)?;
                    }
                }
            }
        }
        Ok(request)
    }
}

fn encode<B: Serialize + ?Sized>(method: &Method, path: &str, body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(|source| Error::Decode {
        operation: format!("{} {}", method, path),
        source,
    })
}
