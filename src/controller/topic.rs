use super::{changed, found, ignore_not_found, reject_replace, required, scoped};
use super::{Backend, Controller, ResourceKind};
use crate::client::RequestContext;
use crate::error::{Error, Result};
use crate::id::parse_import_id;
use crate::model::common::removed_keys;
use crate::model::topic::{self as model, expand_configs, expand_create};
use crate::model::{Attr, TopicState};
use crate::state::StateWriter;
use async_trait::async_trait;
use tracing::instrument;

/// `kafka_topic`. Updates partitions first, then configs.
#[derive(Debug, Clone)]
pub struct TopicController {
    backend: Backend,
}

impl TopicController {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    fn validate_update(&self, what: &str, prior: &TopicState, plan: &TopicState) -> Result<()> {
        reject_replace(what, &self.requires_replace(prior, plan))?;
        if let (Some(from), Some(to)) = (prior.partition.value(), plan.partition.value()) {
            if to < from {
                return Err(Error::validation(format!(
                    "{}: partition count cannot decrease ({} -> {})",
                    what, from, to
                )));
            }
        }
        if !plan.configs.is_unknown() {
            let removed = removed_keys(&prior.config_map(), &plan.config_map());
            if !removed.is_empty() {
                return Err(Error::validation(format!(
                    "{}: removing configs ({}) is not supported; set them to the server default value instead",
                    what,
                    removed.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Controller for TopicController {
    type State = TopicState;

    const KIND: ResourceKind = ResourceKind::KafkaTopic;

    #[instrument(skip_all, fields(topic = plan.name.as_str()))]
    async fn create(
        &self,
        ctx: &RequestContext,
        plan: &TopicState,
        _state: &StateWriter,
    ) -> Result<TopicState> {
        let ctx = scoped(ctx, &plan.environment_id);
        let instance = required(&plan.kafka_instance_id, "kafka topic kafka_instance_id")?;
        let request = expand_create(plan)?;
        let created = self.backend.api.create_topic(&ctx, instance, &request).await?;
        tracing::info!(instance, topic_id = %created.topic_id, "kafka topic created");
        let topic = self.backend.api.get_topic(&ctx, instance, &created.topic_id).await?;
        Ok(model::flatten(&topic, plan))
    }

    #[instrument(skip_all, fields(topic = prior.topic_id.as_str()))]
    async fn read(&self, ctx: &RequestContext, prior: &TopicState) -> Result<Option<TopicState>> {
        let ctx = scoped(ctx, &prior.environment_id);
        let instance = required(&prior.kafka_instance_id, "kafka topic kafka_instance_id")?;
        let id = required(&prior.topic_id, "kafka topic topic_id")?;
        let topic = found(self.backend.api.get_topic(&ctx, instance, id).await)?;
        Ok(topic.map(|t| model::flatten(&t, prior)))
    }

    #[instrument(skip_all, fields(topic = prior.topic_id.as_str()))]
    async fn update(
        &self,
        ctx: &RequestContext,
        prior: &TopicState,
        plan: &TopicState,
        state: &StateWriter,
    ) -> Result<TopicState> {
        let ctx = scoped(ctx, &plan.environment_id);
        let instance = required(&prior.kafka_instance_id, "kafka topic kafka_instance_id")?;
        let id = required(&prior.topic_id, "kafka topic topic_id")?;
        let what = format!("kafka topic {}/{}", instance, id);
        self.validate_update(&what, prior, plan)?;

        let api = &self.backend.api;
        let mut current = prior.clone();

        if let Some(&partition) = plan.partition.value() {
            if Some(&partition) != prior.partition.value() {
                tracing::info!(topic_id = id, partition, "increasing partitions");
                api.update_topic_partition(&ctx, instance, id, partition).await?;
                current.partition = Attr::Known(partition);
                state.save(&current).await?;
            }
        }

        if !plan.configs.is_unknown() && plan.config_map() != prior.config_map() {
            tracing::info!(topic_id = id, "updating topic configs");
            api.update_topic_configs(&ctx, instance, id, &expand_configs(plan)).await?;
            current.configs = plan.configs.clone();
            state.save(&current).await?;
        }

        let topic = api.get_topic(&ctx, instance, id).await?;
        Ok(model::flatten(&topic, plan))
    }

    #[instrument(skip_all, fields(topic = prior.topic_id.as_str()))]
    async fn delete(&self, ctx: &RequestContext, prior: &TopicState) -> Result<()> {
        let ctx = scoped(ctx, &prior.environment_id);
        let instance = required(&prior.kafka_instance_id, "kafka topic kafka_instance_id")?;
        let id = required(&prior.topic_id, "kafka topic topic_id")?;
        if found(self.backend.api.get_topic(&ctx, instance, id).await)?.is_none() {
            return Ok(());
        }
        ignore_not_found(self.backend.api.delete_topic(&ctx, instance, id).await)
    }

    #[instrument(skip_all, fields(import_id = id))]
    async fn import_state(&self, ctx: &RequestContext, id: &str) -> Result<TopicState> {
        let [environment_id, instance_id, topic_id] =
            parse_import_id(id, ["environment_id", "kafka_instance_id", "topic_id"])?;
        let prior = TopicState {
            environment_id: Attr::Known(environment_id),
            kafka_instance_id: Attr::Known(instance_id.clone()),
            topic_id: Attr::Known(topic_id.clone()),
            configs: Attr::Unknown,
            ..Default::default()
        };
        self.read(ctx, &prior)
            .await?
            .ok_or_else(|| Error::not_found(format!("kafka topic {}/{}", instance_id, topic_id)))
    }

    fn requires_replace(&self, prior: &TopicState, plan: &TopicState) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if changed(&prior.environment_id, &plan.environment_id) {
            fields.push("environment_id");
        }
        if changed(&prior.kafka_instance_id, &plan.kafka_instance_id) {
            fields.push("kafka_instance_id");
        }
        if changed(&prior.name, &plan.name) {
            fields.push("name");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::offline_backend;

    fn topic(partition: i64, configs: &[(&str, &str)]) -> TopicState {
        TopicState {
            kafka_instance_id: "kf-1".into(),
            topic_id: "t-1".into(),
            name: "orders".into(),
            partition: Attr::Known(partition),
            configs: Attr::Known(configs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_decrease_and_removal_and_rename() {
        let controller = TopicController::new(offline_backend());
        let prior = topic(3, &[("retention.ms", "1000")]);

        let fewer = topic(2, &[("retention.ms", "1000")]);
        let err = controller.validate_update("kafka topic kf-1/t-1", &prior, &fewer).unwrap_err();
        assert!(err.to_string().contains("cannot decrease"));

        let removed = topic(3, &[]);
        let err = controller.validate_update("kafka topic kf-1/t-1", &prior, &removed).unwrap_err();
        assert!(err.to_string().contains("retention.ms"));

        let renamed = TopicState { name: "payments".into(), ..prior.clone() };
        assert_eq!(controller.requires_replace(&prior, &renamed), vec!["name"]);

        let more = topic(6, &[("retention.ms", "2000"), ("cleanup.policy", "delete")]);
        assert!(controller.validate_update("kafka topic kf-1/t-1", &prior, &more).is_ok());
    }
}
