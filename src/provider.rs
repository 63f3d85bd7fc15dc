//! The coordinator: builds the client from configuration and routes each
//! reconciliation request to the controller for its resource kind.
//!
//! States cross this boundary as JSON objects in the snake_case shape of
//! [`crate::model`]. Every verb persists its outcome through the configured
//! [`StateSink`]: create, update, read and import save the resulting state; delete
//! and a read that finds nothing remove it.
//!
//! ```rust,no_run
//! use automq_reconciler::{Provider, ProviderConfig, RequestContext, ResourceKind};
//! use serde_json::json;
//!
//! # async fn run() -> automq_reconciler::Result<()> {
//! let config = ProviderConfig::default().resolve()?;
//! let provider = Provider::builder(config).build()?;
//! let topic = provider
//!     .create(
//!         &RequestContext::new().with_environment("env-1"),
//!         ResourceKind::KafkaTopic,
//!         json!({"kafka_instance_id": "kf-1", "name": "orders", "partition": 3}),
//!     )
//!     .await?;
//! println!("{}", topic["topic_id"]);
//! # Ok(())
//! # }
//! ```

use crate::api::ApiClient;
use crate::client::{HttpClient, RequestContext};
use crate::config::ResolvedConfig;
use crate::controller::{
    AclController, Backend, Controller, InstanceController, IntegrationController,
    KafkaLinkController, MirrorGroupController, MirrorTopicController, ResourceKind,
    TopicController, UserController,
};
use crate::data_source::{BucketProfiles, DataSources, DeployProfile};
use crate::error::{ApiError, Error, Result};
use crate::model::InstanceState;
use crate::state::{DiscardStateSink, StateSink, StateWriter};
use crate::telemetry::Telemetry;
use crate::transport::{ReqwestTransport, Transport};
use crate::waiter::WaitConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Runs `$body` with `$c` bound to the controller for `$kind`.
macro_rules! route {
    ($self:ident, $kind:expr, |$c:ident| $body:expr) => {
        match $kind {
            ResourceKind::KafkaInstance => {
                let $c = &$self.instances;
                $body
            }
            ResourceKind::KafkaTopic => {
                let $c = &$self.topics;
                $body
            }
            ResourceKind::KafkaUser => {
                let $c = &$self.users;
                $body
            }
            ResourceKind::KafkaAcl => {
                let $c = &$self.acls;
                $body
            }
            ResourceKind::Integration => {
                let $c = &$self.integrations;
                $body
            }
            ResourceKind::KafkaLink => {
                let $c = &$self.links;
                $body
            }
            ResourceKind::KafkaLinkMirrorTopic => {
                let $c = &$self.mirror_topics;
                $body
            }
            ResourceKind::KafkaLinkMirrorGroup => {
                let $c = &$self.mirror_groups;
                $body
            }
        }
    };
}

/// Builder for [`Provider`].
pub struct ProviderBuilder {
    config: ResolvedConfig,
    transport: Option<Arc<dyn Transport>>,
    sink: Arc<dyn StateSink>,
    telemetry: Telemetry,
    waits: Option<WaitConfig>,
}

impl ProviderBuilder {
    /// Send requests through `transport` instead of a reqwest client.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn state_sink(mut self, sink: Arc<dyn StateSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Waiter settings. The telemetry handle is replaced by the provider's.
    pub fn waits(mut self, waits: WaitConfig) -> Self {
        self.waits = Some(waits);
        self
    }

    pub fn build(self) -> Result<Provider> {
        let transport = match self.transport {
            Some(t) => t,
            None => {
                let client = ReqwestTransport::new(self.config.request_timeout())
                    .map_err(|e| Error::api("build http client", ApiError::transport(e)))?;
                Arc::new(client)
            }
        };
        let http = HttpClient::new(self.config.host().clone(), self.config.auth(), transport)
            .with_telemetry(self.telemetry.clone());
        let waits = self.waits.unwrap_or_default().with_telemetry(self.telemetry.clone());
        let backend = Backend::new(ApiClient::new(http), waits);
        tracing::debug!(host = %self.config.host(), "provider configured");
        Ok(Provider {
            instances: InstanceController::new(backend.clone()),
            topics: TopicController::new(backend.clone()),
            users: UserController::new(backend.clone()),
            acls: AclController::new(backend.clone()),
            integrations: IntegrationController::new(backend.clone()),
            links: KafkaLinkController::new(backend.clone()),
            mirror_topics: MirrorTopicController::new(backend.clone()),
            mirror_groups: MirrorGroupController::new(backend.clone()),
            data: DataSources::new(backend),
            sink: self.sink,
            telemetry: self.telemetry,
        })
    }
}

impl fmt::Debug for ProviderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

/// Routes reconciliation requests by [`ResourceKind`].
#[derive(Debug, Clone)]
pub struct Provider {
    instances: InstanceController,
    topics: TopicController,
    users: UserController,
    acls: AclController,
    integrations: IntegrationController,
    links: KafkaLinkController,
    mirror_topics: MirrorTopicController,
    mirror_groups: MirrorGroupController,
    data: DataSources,
    sink: Arc<dyn StateSink>,
    telemetry: Telemetry,
}

fn decode<S: DeserializeOwned>(kind: ResourceKind, what: &str, value: Value) -> Result<S> {
    serde_json::from_value(value).map_err(|source| Error::Decode {
        operation: format!("decode {} {}", kind, what),
        source,
    })
}

fn encode<S: Serialize>(kind: ResourceKind, state: &S) -> Result<Value> {
    serde_json::to_value(state).map_err(|e| Error::State(format!("{}: {}", kind, e)))
}

async fn create_with<C: Controller>(
    c: &C,
    ctx: &RequestContext,
    plan: Value,
    state: &StateWriter,
) -> Result<Value> {
    let plan: C::State = decode(C::KIND, "plan", plan)?;
    let created = c.create(ctx, &plan, state).await?;
    state.save(&created).await?;
    encode(C::KIND, &created)
}

async fn read_with<C: Controller>(
    c: &C,
    ctx: &RequestContext,
    prior: Value,
    state: &StateWriter,
) -> Result<Option<Value>> {
    let prior: C::State = decode(C::KIND, "state", prior)?;
    match c.read(ctx, &prior).await? {
        Some(current) => {
            state.save(&current).await?;
            encode(C::KIND, &current).map(Some)
        }
        None => {
            tracing::info!(kind = %C::KIND, "resource no longer exists, removing from state");
            state.remove().await?;
            Ok(None)
        }
    }
}

async fn update_with<C: Controller>(
    c: &C,
    ctx: &RequestContext,
    prior: Value,
    plan: Value,
    state: &StateWriter,
) -> Result<Value> {
    let prior: C::State = decode(C::KIND, "state", prior)?;
    let plan: C::State = decode(C::KIND, "plan", plan)?;
    let updated = c.update(ctx, &prior, &plan, state).await?;
    state.save(&updated).await?;
    encode(C::KIND, &updated)
}

async fn delete_with<C: Controller>(
    c: &C,
    ctx: &RequestContext,
    prior: Value,
    state: &StateWriter,
) -> Result<()> {
    let prior: C::State = decode(C::KIND, "state", prior)?;
    c.delete(ctx, &prior).await?;
    state.remove().await
}

async fn import_with<C: Controller>(
    c: &C,
    ctx: &RequestContext,
    id: &str,
    state: &StateWriter,
) -> Result<Value> {
    let imported = c.import_state(ctx, id).await?;
    state.save(&imported).await?;
    encode(C::KIND, &imported)
}

fn replace_with<C: Controller>(c: &C, prior: Value, plan: Value) -> Result<Vec<&'static str>> {
    let prior: C::State = decode(C::KIND, "state", prior)?;
    let plan: C::State = decode(C::KIND, "plan", plan)?;
    Ok(c.requires_replace(&prior, &plan))
}

impl Provider {
    pub fn builder(config: ResolvedConfig) -> ProviderBuilder {
        ProviderBuilder {
            config,
            transport: None,
            sink: Arc::new(DiscardStateSink),
            telemetry: Telemetry::default(),
            waits: None,
        }
    }

    fn writer(&self, kind: ResourceKind) -> StateWriter {
        StateWriter::new(kind.as_str(), self.sink.clone(), self.telemetry.clone())
    }

    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn create(&self, ctx: &RequestContext, kind: ResourceKind, plan: Value) -> Result<Value> {
        let state = self.writer(kind);
        route!(self, kind, |c| create_with(c, ctx, plan, &state).await)
    }

    /// Refresh a resource. `Ok(None)` means it is gone and was removed from state.
    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn read(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        prior: Value,
    ) -> Result<Option<Value>> {
        let state = self.writer(kind);
        route!(self, kind, |c| read_with(c, ctx, prior, &state).await)
    }

    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        prior: Value,
        plan: Value,
    ) -> Result<Value> {
        let state = self.writer(kind);
        route!(self, kind, |c| update_with(c, ctx, prior, plan, &state).await)
    }

    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn delete(&self, ctx: &RequestContext, kind: ResourceKind, prior: Value) -> Result<()> {
        let state = self.writer(kind);
        route!(self, kind, |c| delete_with(c, ctx, prior, &state).await)
    }

    /// Adopt an existing resource by its import id (`env@instance@...`).
    #[instrument(skip_all, fields(kind = %kind, import_id = id))]
    pub async fn import(&self, ctx: &RequestContext, kind: ResourceKind, id: &str) -> Result<Value> {
        let state = self.writer(kind);
        route!(self, kind, |c| import_with(c, ctx, id, &state).await)
    }

    /// Attributes whose change needs destroy and recreate. No request is issued.
    pub fn requires_replace(
        &self,
        kind: ResourceKind,
        prior: Value,
        plan: Value,
    ) -> Result<Vec<&'static str>> {
        route!(self, kind, |c| replace_with(c, prior, plan))
    }

    pub async fn deploy_profile(&self, ctx: &RequestContext, name: &str) -> Result<DeployProfile> {
        self.data.deploy_profile(ctx, name).await
    }

    pub async fn bucket_profiles(&self, ctx: &RequestContext, profile: &str) -> Result<BucketProfiles> {
        self.data.bucket_profiles(ctx, profile).await
    }

    pub async fn instance(
        &self,
        ctx: &RequestContext,
        environment_id: &str,
        id: &str,
    ) -> Result<InstanceState> {
        self.data.instance(ctx, environment_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::state::MemoryStateSink;
    use crate::transport::{HttpRequest, HttpResponse, ServiceTransport};
    use serde_json::json;
    use std::convert::Infallible;

    fn resolved() -> ResolvedConfig {
        ProviderConfig {
            host: Some("http://cmp.test".into()),
            token: Some("Bearer t".into()),
            ..Default::default()
        }
        .resolve_with(|_| None)
        .unwrap()
    }

    fn provider(sink: MemoryStateSink) -> Provider {
        let transport = ServiceTransport::new(tower::service_fn(|req: HttpRequest| async move {
            let response = match (req.method.as_str(), req.path_and_query().as_str()) {
                ("GET", "/api/v1/instances/kf-1/topics/t-1") => HttpResponse::json(
                    200,
                    &json!({"topicId": "t-1", "name": "orders", "partition": 3, "compactStrategy": "DELETE"}),
                ),
                (_, path) if path.starts_with("/api/v1/instances/kf-1/topics") => {
                    HttpResponse::new(404, "topic not found")
                }
                _ => HttpResponse::new(500, "unexpected"),
            };
            Ok::<_, Infallible>(response)
        }));
        Provider::builder(resolved())
            .transport(Arc::new(transport))
            .state_sink(Arc::new(sink))
            .telemetry(Telemetry::null())
            .waits(WaitConfig::instant())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn read_saves_or_removes_state() {
        let sink = MemoryStateSink::new();
        let provider = provider(sink.clone());
        let ctx = RequestContext::new();

        let prior = json!({"kafka_instance_id": "kf-1", "topic_id": "t-1", "name": "orders"});
        let current = provider.read(&ctx, ResourceKind::KafkaTopic, prior).await.unwrap().unwrap();
        assert_eq!(current["partition"], 3);
        assert_eq!(sink.latest::<Value>("kafka_topic").unwrap()["partition"], 3);

        let gone = json!({"kafka_instance_id": "kf-1", "topic_id": "t-2", "name": "gone"});
        assert!(provider.read(&ctx, ResourceKind::KafkaTopic, gone).await.unwrap().is_none());
        assert!(sink.latest::<Value>("kafka_topic").is_none());
    }

    #[tokio::test]
    async fn malformed_state_is_a_decode_error() {
        let provider = provider(MemoryStateSink::new());
        let err = provider
            .read(&RequestContext::new(), ResourceKind::KafkaTopic, json!({"partition": "many"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.to_string().contains("kafka_topic"));
    }

    #[test]
    fn replacement_is_routed_by_kind() {
        let provider = provider(MemoryStateSink::new());
        let prior = json!({"kafka_instance_id": "kf-1", "username": "alice", "password": "a"});
        let plan = json!({"kafka_instance_id": "kf-1", "username": "bob", "password": "a"});
        let fields = provider.requires_replace(ResourceKind::KafkaUser, prior, plan).unwrap();
        assert_eq!(fields, vec!["username"]);
    }

    #[tokio::test]
    async fn import_rejects_malformed_ids_without_requests() {
        let provider = provider(MemoryStateSink::new());
        let err = provider
            .import(&RequestContext::new(), ResourceKind::KafkaTopic, "env-1@kf-1")
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
