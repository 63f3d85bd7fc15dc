//! Host-side state persistence.
//!
//! Controllers hand every intermediate and final state to a [`StateSink`] through a
//! [`StateWriter`]. A multi-step update saves after each step, so an interrupted
//! reconciliation leaves a state that reflects exactly the steps that completed.

use crate::error::{BoxError, Error, Result};
use crate::telemetry::{ReconcileEvent, StateEvent, Telemetry};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Receives state snapshots. `None` removes the resource.
#[async_trait]
pub trait StateSink: Send + Sync + fmt::Debug {
    async fn persist(&self, kind: &'static str, state: Option<&Value>) -> Result<(), BoxError>;
}

/// One persisted snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRecord {
    pub kind: &'static str,
    pub state: Option<Value>,
}

/// In-memory sink that keeps every snapshot in order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateSink {
    records: Arc<Mutex<Vec<StateRecord>>>,
}

impl MemoryStateSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StateRecord> {
        self.records.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent snapshot of `kind`, decoded. `None` if never written or removed.
    pub fn latest<T: DeserializeOwned>(&self, kind: &str) -> Option<T> {
        let records = self.records.lock().unwrap_or_else(|p| p.into_inner());
        let last = records.iter().rev().find(|r| r.kind == kind)?;
        last.state.clone().and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn clear(&self) {
        self.records.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

#[async_trait]
impl StateSink for MemoryStateSink {
    async fn persist(&self, kind: &'static str, state: Option<&Value>) -> Result<(), BoxError> {
        self.records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(StateRecord { kind, state: state.cloned() });
        Ok(())
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardStateSink;

#[async_trait]
impl StateSink for DiscardStateSink {
    async fn persist(&self, _kind: &'static str, _state: Option<&Value>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Writes snapshots of one resource kind.
#[derive(Clone, Debug)]
pub struct StateWriter {
    kind: &'static str,
    sink: Arc<dyn StateSink>,
    telemetry: Telemetry,
}

impl StateWriter {
    pub fn new(kind: &'static str, sink: Arc<dyn StateSink>, telemetry: Telemetry) -> Self {
        Self { kind, sink, telemetry }
    }

    /// Writer that keeps nothing.
    pub fn discard(kind: &'static str) -> Self {
        Self::new(kind, Arc::new(DiscardStateSink), Telemetry::null())
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub async fn save<T: Serialize + Sync>(&self, state: &T) -> Result<()> {
        let value = serde_json::to_value(state)
            .map_err(|e| Error::State(format!("{}: {}", self.kind, e)))?;
        self.sink
            .persist(self.kind, Some(&value))
            .await
            .map_err(|e| Error::State(format!("{}: {}", self.kind, e)))?;
        tracing::debug!(kind = self.kind, "state saved");
        self.telemetry.emit(ReconcileEvent::State(StateEvent::Persisted { kind: self.kind })).await;
        Ok(())
    }

    pub async fn remove(&self) -> Result<()> {
        self.sink
            .persist(self.kind, None)
            .await
            .map_err(|e| Error::State(format!("{}: {}", self.kind, e)))?;
        tracing::debug!(kind = self.kind, "state removed");
        self.telemetry.emit(ReconcileEvent::State(StateEvent::Removed { kind: self.kind })).await;
        Ok(())
    }
}
