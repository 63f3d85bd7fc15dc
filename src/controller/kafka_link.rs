use super::{changed, found, ignore_not_found, required, scoped};
use super::{Backend, Controller, ResourceKind};
use crate::client::RequestContext;
use crate::error::{Error, Result};
use crate::id::parse_import_id;
use crate::model::kafka_link::{self as model, expand};
use crate::model::{Attr, KafkaLinkState};
use crate::state::StateWriter;
use async_trait::async_trait;
use tracing::instrument;

/// `kafka_link`. Links cannot be changed after creation.
#[derive(Debug, Clone)]
pub struct KafkaLinkController {
    backend: Backend,
}

impl KafkaLinkController {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Controller for KafkaLinkController {
    type State = KafkaLinkState;

    const KIND: ResourceKind = ResourceKind::KafkaLink;

    #[instrument(skip_all, fields(link = plan.link_id.as_str()))]
    async fn create(
        &self,
        ctx: &RequestContext,
        plan: &KafkaLinkState,
        _state: &StateWriter,
    ) -> Result<KafkaLinkState> {
        let request = expand(plan)?;
        let ctx = scoped(ctx, &plan.environment_id);
        let instance = required(&plan.kafka_instance_id, "kafka link kafka_instance_id")?;
        self.backend.api.create_kafka_link(&ctx, instance, &request).await?;
        tracing::info!(instance, link = %request.link_id, "kafka link created");
        let link = self.backend.api.get_kafka_link(&ctx, instance, &request.link_id).await?;
        Ok(model::flatten(&link, plan))
    }

    #[instrument(skip_all, fields(link = prior.link_id.as_str()))]
    async fn read(&self, ctx: &RequestContext, prior: &KafkaLinkState) -> Result<Option<KafkaLinkState>> {
        let ctx = scoped(ctx, &prior.environment_id);
        let instance = required(&prior.kafka_instance_id, "kafka link kafka_instance_id")?;
        let link_id = required(&prior.link_id, "kafka link link_id")?;
        let link = found(self.backend.api.get_kafka_link(&ctx, instance, link_id).await)?;
        Ok(link.map(|l| model::flatten(&l, prior)))
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        prior: &KafkaLinkState,
        _plan: &KafkaLinkState,
        _state: &StateWriter,
    ) -> Result<KafkaLinkState> {
        Err(Error::validation(format!(
            "kafka link {}: update not supported, recreate the link instead",
            prior.link_id.as_str()
        )))
    }

    #[instrument(skip_all, fields(link = prior.link_id.as_str()))]
    async fn delete(&self, ctx: &RequestContext, prior: &KafkaLinkState) -> Result<()> {
        let ctx = scoped(ctx, &prior.environment_id);
        let instance = required(&prior.kafka_instance_id, "kafka link kafka_instance_id")?;
        let link_id = required(&prior.link_id, "kafka link link_id")?;
        if found(self.backend.api.get_kafka_link(&ctx, instance, link_id).await)?.is_none() {
            return Ok(());
        }
        ignore_not_found(self.backend.api.delete_kafka_link(&ctx, instance, link_id).await)
    }

    #[instrument(skip_all, fields(import_id = id))]
    async fn import_state(&self, ctx: &RequestContext, id: &str) -> Result<KafkaLinkState> {
        let [environment_id, instance_id, link_id] =
            parse_import_id(id, ["environment_id", "kafka_instance_id", "link_id"])?;
        let prior = KafkaLinkState {
            environment_id: Attr::Known(environment_id),
            kafka_instance_id: Attr::Known(instance_id.clone()),
            link_id: Attr::Known(link_id.clone()),
            ..Default::default()
        };
        self.read(ctx, &prior)
            .await?
            .ok_or_else(|| Error::not_found(format!("kafka link {}/{}", instance_id, link_id)))
    }

    fn requires_replace(&self, prior: &KafkaLinkState, plan: &KafkaLinkState) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if changed(&prior.environment_id, &plan.environment_id) {
            fields.push("environment_id");
        }
        if changed(&prior.kafka_instance_id, &plan.kafka_instance_id) {
            fields.push("kafka_instance_id");
        }
        if changed(&prior.link_id, &plan.link_id) {
            fields.push("link_id");
        }
        if changed(&prior.start_offset_time, &plan.start_offset_time) {
            fields.push("start_offset_time");
        }
        if changed(&prior.source_cluster, &plan.source_cluster) {
            fields.push("source_cluster");
        }
        fields
    }
}
