use std::fmt;
use std::time::Duration;

/// Events emitted while reconciling.
///
/// HTTP calls, waiter polls and state writes all report through the same stream so a single
/// sink can reconstruct what a reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Control-plane request outcomes
    Request(RequestEvent),
    /// Async waiter progress
    Wait(WaitEvent),
    /// Host state writes
    State(StateEvent),
}

/// Outcome of one control-plane request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestEvent {
    /// The server answered with a 2xx status.
    Completed {
        method: String,
        path: String,
        status: u16,
        duration: Duration,
    },
    /// The server answered with a non-2xx status, or the transport failed (`status == 0`).
    Failed {
        method: String,
        path: String,
        status: u16,
        duration: Duration,
    },
}

/// Progress of a state-machine wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitEvent {
    /// A refresh returned `state`.
    Polled {
        resource: String,
        state: String,
        /// 1-indexed refresh count
        attempt: usize,
    },
    /// A target state was reached.
    Reached {
        resource: String,
        state: String,
        polls: usize,
    },
    /// The wait ended in an error state, an unexpected state, or a timeout.
    Failed { resource: String, reason: String },
}

/// Host state persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A state snapshot was handed to the sink.
    Persisted { kind: &'static str },
    /// The resource was removed from state.
    Removed { kind: &'static str },
}

impl fmt::Display for ReconcileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileEvent::Request(event) => write!(f, "Request::{}", event),
            ReconcileEvent::Wait(event) => write!(f, "Wait::{}", event),
            ReconcileEvent::State(event) => write!(f, "State::{}", event),
        }
    }
}

impl fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestEvent::Completed { method, path, status, duration } => {
                write!(f, "Completed({} {} -> {}, {:?})", method, path, status, duration)
            }
            RequestEvent::Failed { method, path, status, duration } => {
                write!(f, "Failed({} {} -> {}, {:?})", method, path, status, duration)
            }
        }
    }
}

impl fmt::Display for WaitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitEvent::Polled { resource, state, attempt } => {
                write!(f, "Polled({} is {}, #{})", resource, state, attempt)
            }
            WaitEvent::Reached { resource, state, polls } => {
                write!(f, "Reached({} is {} after {} polls)", resource, state, polls)
            }
            WaitEvent::Failed { resource, reason } => write!(f, "Failed({}: {})", resource, reason),
        }
    }
}

impl fmt::Display for StateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateEvent::Persisted { kind } => write!(f, "Persisted({})", kind),
            StateEvent::Removed { kind } => write!(f, "Removed({})", kind),
        }
    }
}
