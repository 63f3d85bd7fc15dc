#![allow(dead_code)]

//! Scripted control plane for integration tests.
//!
//! Routes are keyed by method and path. Each route holds a queue of responses: they
//! are served in order and the last one repeats. Unrouted requests get a 404.

use automq_reconciler::client::ENVIRONMENT_HEADER;
use automq_reconciler::config::ProviderConfig;
use automq_reconciler::transport::{HttpRequest, HttpResponse, ServiceTransport, Transport};
use automq_reconciler::{MemoryStateSink, Provider, Telemetry, WaitConfig};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Value,
    pub environment: Option<String>,
    pub authorization: Option<String>,
}

impl Recorded {
    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

#[derive(Default)]
struct Inner {
    routes: HashMap<(String, String), VecDeque<HttpResponse>>,
    requests: Vec<Recorded>,
}

#[derive(Clone, Default)]
pub struct FakePlane {
    inner: Arc<Mutex<Inner>>,
}

pub fn ok(value: Value) -> HttpResponse {
    HttpResponse::json(200, &value)
}

pub fn empty() -> HttpResponse {
    HttpResponse::new(200, "")
}

pub fn status(code: u16, body: &str) -> HttpResponse {
    HttpResponse::new(code, body.to_string())
}

pub fn page(items: Value) -> HttpResponse {
    ok(serde_json::json!({"list": items, "pageNum": 1, "pageSize": 100, "total": 1, "totalPage": 1}))
}

impl FakePlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the responses for `method path`.
    pub fn on<I>(&self, method: &str, path: &str, responses: I) -> &Self
    where
        I: IntoIterator<Item = HttpResponse>,
    {
        self.inner
            .lock()
            .unwrap()
            .routes
            .insert((method.to_string(), path.to_string()), responses.into_iter().collect());
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Requests other than GETs, in order, as `METHOD path`.
    pub fn writes(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != "GET")
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn calls(&self, method: &str, path: &str) -> usize {
        self.requests().iter().filter(|r| r.is(method, path)).count()
    }

    pub fn last(&self, method: &str, path: &str) -> Option<Recorded> {
        self.requests().into_iter().rev().find(|r| r.is(method, path))
    }

    pub fn clear_requests(&self) {
        self.inner.lock().unwrap().requests.clear();
    }

    fn respond(&self, request: HttpRequest) -> HttpResponse {
        let header = |name: &str| {
            request.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
        };
        let recorded = Recorded {
            method: request.method.to_string(),
            path: request.url.path().to_string(),
            query: request.url.query().map(str::to_string),
            body: request.json_body(),
            environment: header(ENVIRONMENT_HEADER),
            authorization: header("authorization"),
        };
        let key = (recorded.method.clone(), recorded.path.clone());
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(recorded);
        match inner.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => status(404, &format!("no route for {} {}", key.0, key.1)),
        }
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        let plane = self.clone();
        Arc::new(ServiceTransport::new(tower::service_fn(move |request: HttpRequest| {
            let response = plane.respond(request);
            async move { Ok::<_, Infallible>(response) }
        })))
    }

    pub fn provider_with(&self, config: ProviderConfig, sink: MemoryStateSink) -> Provider {
        let resolved = config.resolve_with(|_| None).unwrap();
        Provider::builder(resolved)
            .transport(self.transport())
            .state_sink(Arc::new(sink))
            .telemetry(Telemetry::null())
            .waits(WaitConfig::instant())
            .build()
            .unwrap()
    }

    pub fn provider(&self, sink: MemoryStateSink) -> Provider {
        self.provider_with(
            ProviderConfig {
                host: Some("http://cmp.test".into()),
                token: Some("Bearer test-token".into()),
                ..Default::default()
            },
            sink,
        )
    }
}
