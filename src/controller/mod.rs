//! Resource controllers: create, read, update, delete and import for each resource kind.
//!
//! Controllers are stateless between calls. Everything a verb needs comes in as
//! arguments (the prior and/or desired state) and goes out through the return value
//! and the [`StateWriter`]. Rules shared by every kind:
//!
//! - create re-reads the resource after the API call;
//! - read turns not-found into `Ok(None)` (remove from state);
//! - update issues one call per attribute group in a fixed order and saves state
//!   after each group;
//! - delete checks the resource first and treats not-found as success.

mod acl;
mod instance;
mod integration;
mod kafka_link;
mod mirror;
mod topic;
mod user;

pub use acl::AclController;
pub use instance::InstanceController;
pub use integration::IntegrationController;
pub use kafka_link::KafkaLinkController;
pub use mirror::{MirrorGroupController, MirrorTopicController};
pub use topic::TopicController;
pub use user::UserController;

use crate::api::ApiClient;
use crate::client::RequestContext;
use crate::error::{Error, Result};
use crate::model::Attr;
use crate::state::StateWriter;
use crate::waiter::WaitConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every resource kind the reconciler manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    KafkaInstance,
    KafkaTopic,
    KafkaUser,
    KafkaAcl,
    Integration,
    KafkaLink,
    KafkaLinkMirrorTopic,
    KafkaLinkMirrorGroup,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::KafkaInstance,
        ResourceKind::KafkaTopic,
        ResourceKind::KafkaUser,
        ResourceKind::KafkaAcl,
        ResourceKind::Integration,
        ResourceKind::KafkaLink,
        ResourceKind::KafkaLinkMirrorTopic,
        ResourceKind::KafkaLinkMirrorGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::KafkaInstance => "kafka_instance",
            ResourceKind::KafkaTopic => "kafka_topic",
            ResourceKind::KafkaUser => "kafka_user",
            ResourceKind::KafkaAcl => "kafka_acl",
            ResourceKind::Integration => "integration",
            ResourceKind::KafkaLink => "kafka_link",
            ResourceKind::KafkaLinkMirrorTopic => "kafka_link_mirror_topic",
            ResourceKind::KafkaLinkMirrorGroup => "kafka_link_mirror_group",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown resource kind {:?}", s)))
    }
}

/// Lifecycle of one resource kind.
#[async_trait]
pub trait Controller: Send + Sync + fmt::Debug {
    type State: Serialize + DeserializeOwned + Clone + Default + fmt::Debug + Send + Sync + 'static;

    const KIND: ResourceKind;

    /// Create from `plan`. Intermediate states go to `state`; the final one is returned.
    async fn create(
        &self,
        ctx: &RequestContext,
        plan: &Self::State,
        state: &StateWriter,
    ) -> Result<Self::State>;

    /// Refresh `prior` from the server. `None` means the resource is gone.
    async fn read(&self, ctx: &RequestContext, prior: &Self::State) -> Result<Option<Self::State>>;

    /// Move from `prior` to `plan` in place.
    async fn update(
        &self,
        ctx: &RequestContext,
        prior: &Self::State,
        plan: &Self::State,
        state: &StateWriter,
    ) -> Result<Self::State>;

    async fn delete(&self, ctx: &RequestContext, prior: &Self::State) -> Result<()>;

    /// Build a full state from an import id.
    async fn import_state(&self, ctx: &RequestContext, id: &str) -> Result<Self::State>;

    /// Attributes whose change from `prior` to `plan` needs destroy and recreate.
    fn requires_replace(&self, prior: &Self::State, plan: &Self::State) -> Vec<&'static str>;
}

/// What every controller holds: the typed API and the waiter settings.
#[derive(Debug, Clone)]
pub struct Backend {
    pub api: ApiClient,
    pub waits: WaitConfig,
}

impl Backend {
    pub fn new(api: ApiClient, waits: WaitConfig) -> Self {
        Self { api, waits }
    }
}

/// Context carrying the resource's environment header.
pub(crate) fn scoped(ctx: &RequestContext, environment_id: &Attr<String>) -> RequestContext {
    match environment_id.non_empty() {
        Some(env) => ctx.clone().with_environment(env),
        None => ctx.clone(),
    }
}

/// A value that must already be in state (ids assigned by the server, parent ids).
pub(crate) fn required<'a>(value: &'a Attr<String>, what: &str) -> Result<&'a str> {
    value
        .non_empty()
        .ok_or_else(|| Error::validation(format!("{} is not set", what)))
}

/// `plan` differs from `prior`. An unknown plan value is not a change.
pub(crate) fn changed<T: PartialEq>(prior: &Attr<T>, plan: &Attr<T>) -> bool {
    !plan.is_unknown() && prior.value() != plan.value()
}

/// Rejects an update that touches attributes needing replacement.
pub(crate) fn reject_replace(what: &str, fields: &[&'static str]) -> Result<()> {
    if fields.is_empty() {
        return Ok(());
    }
    Err(Error::validation(format!(
        "{}: changing {} requires replacing the resource",
        what,
        fields.join(", ")
    )))
}

/// Not-found is the desired outcome of a delete.
pub(crate) fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        other => other,
    }
}

/// Not-found becomes `None`.
pub(crate) fn found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Backend whose transport answers every request with HTTP 500.
#[cfg(test)]
pub(crate) fn offline_backend() -> Backend {
    use crate::client::{Auth, HttpClient};
    use crate::transport::{HttpRequest, HttpResponse, ServiceTransport};
    use std::sync::Arc;

    let transport = ServiceTransport::new(tower::service_fn(|_req: HttpRequest| async {
        Ok::<_, std::convert::Infallible>(HttpResponse::new(500, "offline"))
    }));
    let http = HttpClient::new(
        "https://cp.example.com/".parse().expect("static url"),
        Auth::Token("test".into()),
        Arc::new(transport),
    )
    .with_telemetry(crate::telemetry::Telemetry::null());
    Backend::new(ApiClient::new(http), WaitConfig::instant())
}
