use super::events::ReconcileEvent;
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A telemetry sink that consumes reconciliation events.
pub trait TelemetrySink:
    tower::Service<ReconcileEvent, Response = (), Error = Self::SinkError> + Clone + Send + 'static
{
    /// The error type for this sink.
    type SinkError: std::error::Error + Send + 'static;
}

/// Best-effort emit helper that honors `poll_ready` and swallows errors.
///
/// Telemetry never fails a reconciliation: if a sink is not ready or errors, the event is dropped.
pub async fn emit_best_effort<S>(sink: S, event: ReconcileEvent)
where
    S: tower::Service<ReconcileEvent, Response = ()> + Send + Clone + 'static,
    S::Error: std::error::Error + Send + 'static,
    S::Future: Send + 'static,
{
    use tower::ServiceExt;

    if let Ok(mut ready_sink) = sink.ready_oneshot().await {
        let _ = ready_sink.call(event).await;
    }
}

/// Object-safe view over any [`TelemetrySink`], so clients can hold one without generics.
pub trait EventEmitter: Send + Sync + fmt::Debug {
    fn emit(&self, event: ReconcileEvent) -> BoxFuture<'static, ()>;
}

impl<S> EventEmitter for S
where
    S: TelemetrySink + Sync + fmt::Debug,
    S::Future: Send + 'static,
{
    fn emit(&self, event: ReconcileEvent) -> BoxFuture<'static, ()> {
        Box::pin(emit_best_effort(self.clone(), event))
    }
}

/// Cloneable handle shared by the HTTP client, the waiter and the controllers.
#[derive(Clone, Debug)]
pub struct Telemetry {
    emitter: Arc<dyn EventEmitter>,
}

impl Telemetry {
    pub fn new<S>(sink: S) -> Self
    where
        S: TelemetrySink + Sync + fmt::Debug,
        S::Future: Send + 'static,
    {
        Self { emitter: Arc::new(sink) }
    }

    /// Handle that discards everything.
    pub fn null() -> Self {
        Self::new(NullSink)
    }

    pub async fn emit(&self, event: ReconcileEvent) {
        self.emitter.emit(event).await;
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new(LogSink)
    }
}

/// A no-op telemetry sink that discards all events.
#[derive(Clone, Debug, Default)]
pub struct NullSink;

impl Service<ReconcileEvent> for NullSink {
    type Response = ();
    type Error = Infallible;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _event: ReconcileEvent) -> Self::Future {
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for NullSink {
    type SinkError = Infallible;
}

/// A telemetry sink that logs events using the `tracing` crate.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

impl Service<ReconcileEvent> for LogSink {
    type Response = ();
    type Error = Infallible;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: ReconcileEvent) -> Self::Future {
        tracing::debug!(event = %event, "reconcile_event");
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for LogSink {
    type SinkError = Infallible;
}

/// A telemetry sink that stores events in memory, evicting the oldest past `capacity`.
#[derive(Clone, Debug)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<ReconcileEvent>>>,
    capacity: usize,
    evicted: Arc<AtomicU64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn events(&self) -> Vec<ReconcileEvent> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<ReconcileEvent> for MemorySink {
    type Response = ();
    type Error = Infallible;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: ReconcileEvent) -> Self::Future {
        let mut guard = self.events.lock().unwrap_or_else(|p| p.into_inner());
        if guard.len() >= self.capacity {
            guard.remove(0);
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        guard.push(event);
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for MemorySink {
    type SinkError = Infallible;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::events::StateEvent;

    fn persisted() -> ReconcileEvent {
        ReconcileEvent::State(StateEvent::Persisted { kind: "kafka_instance" })
    }

    #[tokio::test]
    async fn memory_sink_evicts_oldest() {
        let sink = MemorySink::with_capacity(2);
        let telemetry = Telemetry::new(sink.clone());
        telemetry.emit(persisted()).await;
        telemetry.emit(ReconcileEvent::State(StateEvent::Removed { kind: "a" })).await;
        telemetry.emit(ReconcileEvent::State(StateEvent::Removed { kind: "b" })).await;
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.evicted(), 1);
        assert_eq!(sink.events()[0], ReconcileEvent::State(StateEvent::Removed { kind: "a" }));
    }

    #[derive(Clone)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedWriter {
        type Writer = SharedGuard;
        fn make_writer(&'a self) -> Self::Writer {
            SharedGuard(self.0.clone())
        }
    }

    struct SharedGuard(Arc<Mutex<Vec<u8>>>);
    impl std::io::Write for SharedGuard {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn log_sink_writes_the_event() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(SharedWriter(buffer.clone()))
            .with_max_level(tracing::Level::DEBUG)
            .without_time()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        Telemetry::new(LogSink).emit(persisted()).await;

        let logs = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("reconcile_event"), "{}", logs);
        assert!(logs.contains("State::Persisted(kafka_instance)"), "{}", logs);
    }

    #[tokio::test]
    async fn null_and_log_sinks_accept_everything() {
        Telemetry::null().emit(persisted()).await;
        Telemetry::default().emit(persisted()).await;
    }

    #[derive(Clone, Debug)]
    struct FailingSink;

    #[derive(Debug, thiserror::Error)]
    #[error("sink down")]
    struct SinkDown;

    impl Service<ReconcileEvent> for FailingSink {
        type Response = ();
        type Error = SinkDown;
        type Future = Pin<Box<dyn std::future::Future<Output = Result<(), SinkDown>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _event: ReconcileEvent) -> Self::Future {
            Box::pin(async { Err(SinkDown) })
        }
    }

    impl TelemetrySink for FailingSink {
        type SinkError = SinkDown;
    }

    #[tokio::test]
    async fn sink_errors_are_swallowed() {
        Telemetry::new(FailingSink).emit(persisted()).await;
    }
}
