use super::{changed, found, ignore_not_found, reject_replace, required, scoped};
use super::{Backend, Controller, ResourceKind};
use crate::api::{MirrorGroupVO, MirrorTopicVO};
use crate::client::RequestContext;
use crate::error::{Error, Result};
use crate::id::parse_import_id;
use crate::model::mirror::{self as model, desired_topic_state, LINKING};
use crate::model::{Attr, MirrorGroupState, MirrorTopicState};
use crate::state::StateWriter;
use async_trait::async_trait;
use tracing::instrument;

/// Parent ids shared by mirror topics and groups.
struct Link<'a> {
    instance: &'a str,
    link: &'a str,
}

fn link<'a>(instance: &'a Attr<String>, link: &'a Attr<String>) -> Result<Link<'a>> {
    Ok(Link {
        instance: required(instance, "mirror kafka_instance_id")?,
        link: required(link, "mirror kafka_link_id")?,
    })
}

/// `kafka_link_mirror_topic`. Identified by its source topic name within a link.
#[derive(Debug, Clone)]
pub struct MirrorTopicController {
    backend: Backend,
}

impl MirrorTopicController {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    async fn find(&self, ctx: &RequestContext, parent: &Link<'_>, source: &str) -> Result<MirrorTopicVO> {
        self.backend
            .api
            .list_mirror_topics(ctx, parent.instance, parent.link)
            .await?
            .into_iter()
            .find(|t| t.source_topic_name == source)
            .ok_or_else(|| {
                Error::not_found(format!("mirror topic {} on link {}", source, parent.link))
            })
    }

    async fn set_state(
        &self,
        ctx: &RequestContext,
        parent: &Link<'_>,
        topic: &MirrorTopicVO,
        desired: &str,
    ) -> Result<()> {
        tracing::info!(mirror_topic = %topic.mirror_topic_id, from = %topic.state, to = desired, "changing mirror topic state");
        self.backend
            .api
            .update_mirror_topic_state(ctx, parent.instance, parent.link, &topic.mirror_topic_id, desired)
            .await
    }
}

#[async_trait]
impl Controller for MirrorTopicController {
    type State = MirrorTopicState;

    const KIND: ResourceKind = ResourceKind::KafkaLinkMirrorTopic;

    #[instrument(skip_all, fields(source = plan.source_topic_name.as_str()))]
    async fn create(
        &self,
        ctx: &RequestContext,
        plan: &MirrorTopicState,
        state: &StateWriter,
    ) -> Result<MirrorTopicState> {
        let request = model::expand_topic(plan)?;
        let desired = desired_topic_state(plan)?;
        let ctx = scoped(ctx, &plan.environment_id);
        let parent = link(&plan.kafka_instance_id, &plan.kafka_link_id)?;

        self.backend
            .api
            .create_mirror_topic(&ctx, parent.instance, parent.link, &request)
            .await?;
        let mut topic = self.find(&ctx, &parent, &request.source_topic_name).await?;

        if let Some(desired) = desired.filter(|s| *s != LINKING) {
            let created = model::flatten_topic(&topic, plan);
            state.save(&created).await?;
            self.set_state(&ctx, &parent, &topic, desired).await?;
            topic = self.find(&ctx, &parent, &request.source_topic_name).await?;
        }
        Ok(model::flatten_topic(&topic, plan))
    }

    #[instrument(skip_all, fields(source = prior.source_topic_name.as_str()))]
    async fn read(&self, ctx: &RequestContext, prior: &MirrorTopicState) -> Result<Option<MirrorTopicState>> {
        let ctx = scoped(ctx, &prior.environment_id);
        let parent = link(&prior.kafka_instance_id, &prior.kafka_link_id)?;
        let source = required(&prior.source_topic_name, "mirror topic source_topic_name")?;
        let topic = found(self.find(&ctx, &parent, source).await)?;
        Ok(topic.map(|t| model::flatten_topic(&t, prior)))
    }

    #[instrument(skip_all, fields(source = prior.source_topic_name.as_str()))]
    async fn update(
        &self,
        ctx: &RequestContext,
        prior: &MirrorTopicState,
        plan: &MirrorTopicState,
        _state: &StateWriter,
    ) -> Result<MirrorTopicState> {
        let source = required(&prior.source_topic_name, "mirror topic source_topic_name")?;
        reject_replace(&format!("mirror topic {}", source), &self.requires_replace(prior, plan))?;
        let desired = desired_topic_state(plan)?;
        let ctx = scoped(ctx, &plan.environment_id);
        let parent = link(&prior.kafka_instance_id, &prior.kafka_link_id)?;

        let mut topic = self.find(&ctx, &parent, source).await?;
        if let Some(desired) = desired {
            if topic.state != desired {
                self.set_state(&ctx, &parent, &topic, desired).await?;
                topic = self.find(&ctx, &parent, source).await?;
            }
        }
        Ok(model::flatten_topic(&topic, plan))
    }

    #[instrument(skip_all, fields(source = prior.source_topic_name.as_str()))]
    async fn delete(&self, ctx: &RequestContext, prior: &MirrorTopicState) -> Result<()> {
        let Some(mirror_id) = prior.mirror_topic_id.non_empty() else {
            tracing::debug!("no mirror topic id in state, nothing to delete");
            return Ok(());
        };
        let ctx = scoped(ctx, &prior.environment_id);
        let parent = link(&prior.kafka_instance_id, &prior.kafka_link_id)?;
        ignore_not_found(
            self.backend
                .api
                .delete_mirror_topic(&ctx, parent.instance, parent.link, mirror_id)
                .await,
        )
    }

    #[instrument(skip_all, fields(import_id = id))]
    async fn import_state(&self, ctx: &RequestContext, id: &str) -> Result<MirrorTopicState> {
        let [environment_id, instance_id, link_id, source] = parse_import_id(
            id,
            ["environment_id", "kafka_instance_id", "kafka_link_id", "source_topic_name"],
        )?;
        let prior = MirrorTopicState {
            environment_id: Attr::Known(environment_id),
            kafka_instance_id: Attr::Known(instance_id),
            kafka_link_id: Attr::Known(link_id.clone()),
            source_topic_name: Attr::Known(source.clone()),
            ..Default::default()
        };
        self.read(ctx, &prior).await?.ok_or_else(|| {
            Error::not_found(format!("mirror topic {} on link {}", source, link_id))
        })
    }

    fn requires_replace(&self, prior: &MirrorTopicState, plan: &MirrorTopicState) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if changed(&prior.environment_id, &plan.environment_id) {
            fields.push("environment_id");
        }
        if changed(&prior.kafka_instance_id, &plan.kafka_instance_id) {
            fields.push("kafka_instance_id");
        }
        if changed(&prior.kafka_link_id, &plan.kafka_link_id) {
            fields.push("kafka_link_id");
        }
        if changed(&prior.source_topic_name, &plan.source_topic_name) {
            fields.push("source_topic_name");
        }
        fields
    }
}

/// `kafka_link_mirror_group`. Immutable.
#[derive(Debug, Clone)]
pub struct MirrorGroupController {
    backend: Backend,
}

impl MirrorGroupController {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    async fn find(&self, ctx: &RequestContext, parent: &Link<'_>, source: &str) -> Result<MirrorGroupVO> {
        self.backend
            .api
            .list_mirror_groups(ctx, parent.instance, parent.link)
            .await?
            .into_iter()
            .find(|g| g.source_group_id == source)
            .ok_or_else(|| {
                Error::not_found(format!("mirror group {} on link {}", source, parent.link))
            })
    }
}

#[async_trait]
impl Controller for MirrorGroupController {
    type State = MirrorGroupState;

    const KIND: ResourceKind = ResourceKind::KafkaLinkMirrorGroup;

    #[instrument(skip_all, fields(source = plan.source_group_id.as_str()))]
    async fn create(
        &self,
        ctx: &RequestContext,
        plan: &MirrorGroupState,
        _state: &StateWriter,
    ) -> Result<MirrorGroupState> {
        let request = model::expand_group(plan)?;
        let ctx = scoped(ctx, &plan.environment_id);
        let parent = link(&plan.kafka_instance_id, &plan.kafka_link_id)?;
        self.backend
            .api
            .create_mirror_group(&ctx, parent.instance, parent.link, &request)
            .await?;
        let group = self.find(&ctx, &parent, &request.source_group_id).await?;
        Ok(model::flatten_group(&group, plan))
    }

    #[instrument(skip_all, fields(source = prior.source_group_id.as_str()))]
    async fn read(&self, ctx: &RequestContext, prior: &MirrorGroupState) -> Result<Option<MirrorGroupState>> {
        let ctx = scoped(ctx, &prior.environment_id);
        let parent = link(&prior.kafka_instance_id, &prior.kafka_link_id)?;
        let source = required(&prior.source_group_id, "mirror group source_group_id")?;
        let group = found(self.find(&ctx, &parent, source).await)?;
        Ok(group.map(|g| model::flatten_group(&g, prior)))
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        prior: &MirrorGroupState,
        plan: &MirrorGroupState,
        _state: &StateWriter,
    ) -> Result<MirrorGroupState> {
        let what = format!("mirror group {}", prior.source_group_id.as_str());
        reject_replace(&what, &self.requires_replace(prior, plan))?;
        Ok(prior.clone())
    }

    #[instrument(skip_all, fields(source = prior.source_group_id.as_str()))]
    async fn delete(&self, ctx: &RequestContext, prior: &MirrorGroupState) -> Result<()> {
        let Some(mirror_id) = prior.mirror_group_id.non_empty() else {
            return Ok(());
        };
        let ctx = scoped(ctx, &prior.environment_id);
        let parent = link(&prior.kafka_instance_id, &prior.kafka_link_id)?;
        ignore_not_found(
            self.backend
                .api
                .delete_mirror_group(&ctx, parent.instance, parent.link, mirror_id)
                .await,
        )
    }

    #[instrument(skip_all, fields(import_id = id))]
    async fn import_state(&self, ctx: &RequestContext, id: &str) -> Result<MirrorGroupState> {
        let [environment_id, instance_id, link_id, source] = parse_import_id(
            id,
            ["environment_id", "kafka_instance_id", "kafka_link_id", "source_group_id"],
        )?;
        let prior = MirrorGroupState {
            environment_id: Attr::Known(environment_id),
            kafka_instance_id: Attr::Known(instance_id),
            kafka_link_id: Attr::Known(link_id.clone()),
            source_group_id: Attr::Known(source.clone()),
            ..Default::default()
        };
        self.read(ctx, &prior).await?.ok_or_else(|| {
            Error::not_found(format!("mirror group {} on link {}", source, link_id))
        })
    }

    fn requires_replace(&self, prior: &MirrorGroupState, plan: &MirrorGroupState) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if changed(&prior.environment_id, &plan.environment_id) {
            fields.push("environment_id");
        }
        if changed(&prior.kafka_instance_id, &plan.kafka_instance_id) {
            fields.push("kafka_instance_id");
        }
        if changed(&prior.kafka_link_id, &plan.kafka_link_id) {
            fields.push("kafka_link_id");
        }
        if changed(&prior.source_group_id, &plan.source_group_id) {
            fields.push("source_group_id");
        }
        fields
    }
}
