//! Telemetry for reconciliations.
//!
//! Every control-plane request, waiter poll and state write produces a
//! [`ReconcileEvent`]. Events flow through `TelemetrySink` implementations
//! (plain `tower::Service<ReconcileEvent>`s) which can log, aggregate, or forward
//! them. Delivery is best effort: a failing sink never fails a reconciliation.

pub mod events;
pub mod sinks;

pub use events::{ReconcileEvent, RequestEvent, StateEvent, WaitEvent};
pub use sinks::{
    emit_best_effort, EventEmitter, LogSink, MemorySink, NullSink, Telemetry, TelemetrySink,
};
