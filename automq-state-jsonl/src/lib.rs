//! JSON-lines sinks for `automq-reconciler`. One record per line.
//! Always appends; bring your own path.

use async_trait::async_trait;
use automq_reconciler::error::BoxError;
use automq_reconciler::state::StateSink;
use automq_reconciler::telemetry::{
    ReconcileEvent, RequestEvent, StateEvent, TelemetrySink, WaitEvent,
};
use serde_json::{json, Value};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

async fn append(path: &Path, line: String) -> io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

/// Appends `{"kind": ..., "state": ...}` per persisted snapshot.
#[derive(Clone, Debug)]
pub struct JsonlStateSink {
    path: PathBuf,
    // keeps concurrent writers from interleaving within this process
    lock: Arc<Mutex<()>>,
}

impl JsonlStateSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into(), lock: Arc::new(Mutex::new(())) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest snapshot of `kind`. `None` when never written, removed, or the file is missing.
    ///
    /// Lines that fail to parse (a torn final write) are skipped.
    pub async fn load(&self, kind: &str) -> io::Result<Option<Value>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut latest = None;
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            let record: Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "skipping malformed state line");
                    continue;
                }
            };
            if record.get("kind").and_then(Value::as_str) == Some(kind) {
                latest = record.get("state").filter(|s| !s.is_null()).cloned();
            }
        }
        Ok(latest)
    }
}

#[async_trait]
impl StateSink for JsonlStateSink {
    async fn persist(&self, kind: &'static str, state: Option<&Value>) -> Result<(), BoxError> {
        let line = json!({ "kind": kind, "state": state }).to_string() + "\n";
        let _guard = self.lock.lock().await;
        append(&self.path, line).await?;
        Ok(())
    }
}

/// Appends one telemetry event per line.
#[derive(Clone, Debug)]
pub struct JsonlEventSink {
    path: PathBuf,
}

impl JsonlEventSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl tower_service::Service<ReconcileEvent> for JsonlEventSink {
    type Response = ();
    type Error = io::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: ReconcileEvent) -> Self::Future {
        let path = self.path.clone();
        let line = event_to_json(&event).to_string() + "\n";
        Box::pin(async move { append(&path, line).await })
    }
}

impl TelemetrySink for JsonlEventSink {
    type SinkError = io::Error;
}

fn event_to_json(event: &ReconcileEvent) -> Value {
    match event {
        ReconcileEvent::Request(r) => match r {
            RequestEvent::Completed { method, path, status, duration } => json!({
                "kind": "request_completed",
                "method": method,
                "path": path,
                "status": status,
                "duration_ms": duration.as_millis(),
            }),
            RequestEvent::Failed { method, path, status, duration } => json!({
                "kind": "request_failed",
                "method": method,
                "path": path,
                "status": status,
                "duration_ms": duration.as_millis(),
            }),
        },
        ReconcileEvent::Wait(w) => match w {
            WaitEvent::Polled { resource, state, attempt } => {
                json!({ "kind": "wait_polled", "resource": resource, "state": state, "attempt": attempt })
            }
            WaitEvent::Reached { resource, state, polls } => {
                json!({ "kind": "wait_reached", "resource": resource, "state": state, "polls": polls })
            }
            WaitEvent::Failed { resource, reason } => {
                json!({ "kind": "wait_failed", "resource": resource, "reason": reason })
            }
        },
        ReconcileEvent::State(s) => match s {
            StateEvent::Persisted { kind } => json!({ "kind": "state_persisted", "resource_kind": kind }),
            StateEvent::Removed { kind } => json!({ "kind": "state_removed", "resource_kind": kind }),
        },
    }
}
