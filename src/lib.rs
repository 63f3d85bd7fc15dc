#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # automq-reconciler
//!
//! Declarative management of AutoMQ BYOC control-plane resources: Kafka instances,
//! topics, users, ACLs, integrations, Kafka links and their mirror topics and groups.
//!
//! The crate is layered bottom-up:
//!
//! - [`signer`]: HMAC-SHA256 request signing (header and presigned-URL forms);
//! - [`client`] and [`transport`]: authenticated HTTP with cancellation and telemetry;
//! - [`api`]: typed endpoints over the client;
//! - [`model`]: desired-state objects with tri-state attributes, `expand` and `flatten`;
//! - [`id`]: composite identifiers for ACLs and import ids;
//! - [`waiter`]: polls asynchronous operations until they settle;
//! - [`controller`]: create / read / update / delete / import per resource kind;
//! - [`provider`]: configuration and routing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use automq_reconciler::{Provider, ProviderConfig, RequestContext, ResourceKind};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> automq_reconciler::Result<()> {
//!     // host and credentials come from AUTOMQ_BYOC_HOST / AUTOMQ_TOKEN
//!     let provider = Provider::builder(ProviderConfig::default().resolve()?).build()?;
//!     let ctx = RequestContext::new().with_environment("env-1");
//!     let user = provider
//!         .create(
//!             &ctx,
//!             ResourceKind::KafkaUser,
//!             json!({"kafka_instance_id": "kf-1", "username": "alice", "password": "s3cret"}),
//!         )
//!         .await?;
//!     println!("created {}", user["username"]);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod clock;
pub mod config;
pub mod controller;
pub mod data_source;
pub mod error;
pub mod id;
pub mod model;
pub mod provider;
pub mod signer;
pub mod sleeper;
pub mod state;
pub mod telemetry;
pub mod transport;
pub mod waiter;

// Re-exports
pub use client::{Auth, HttpClient, RequestContext};
pub use clock::{Clock, FixedWallClock, ManualClock, MonotonicClock, SystemWallClock, WallClock};
pub use config::{ConfigError, ProviderConfig, ResolvedConfig};
pub use controller::{Backend, Controller, ResourceKind};
pub use error::{ApiError, Error, Result};
pub use id::AclId;
pub use model::Attr;
pub use provider::{Provider, ProviderBuilder};
pub use signer::{Credentials, Signer};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use state::{MemoryStateSink, StateSink, StateWriter};
pub use telemetry::{ReconcileEvent, Telemetry};
pub use transport::{ReqwestTransport, ServiceTransport, Transport};
pub use waiter::{WaitConfig, Waiter};
