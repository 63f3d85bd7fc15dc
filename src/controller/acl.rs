use super::{changed, found, ignore_not_found, reject_replace, required, scoped};
use super::{Backend, Controller, ResourceKind};
use crate::api::AclBinding;
use crate::client::RequestContext;
use crate::error::{Error, Result};
use crate::id::{parse_import_id, AclId};
use crate::model::acl::{self as model, acl_id, expand, filter, prior_binding};
use crate::model::{AclState, Attr};
use crate::state::StateWriter;
use async_trait::async_trait;
use tracing::instrument;

/// `kafka_acl`. Immutable: any change is a replacement.
///
/// The server has no id for a binding, so lookups re-issue the filtered list query
/// keyed by the composite [`AclId`].
#[derive(Debug, Clone)]
pub struct AclController {
    backend: Backend,
}

impl AclController {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    async fn lookup(
        &self,
        ctx: &RequestContext,
        instance: &str,
        id: &AclId,
        hint: Option<&AclBinding>,
    ) -> Result<AclBinding> {
        self.backend.api.get_acl(ctx, instance, &filter(id), hint).await
    }
}

#[async_trait]
impl Controller for AclController {
    type State = AclState;

    const KIND: ResourceKind = ResourceKind::KafkaAcl;

    #[instrument(skip_all, fields(principal = plan.principal.as_str()))]
    async fn create(
        &self,
        ctx: &RequestContext,
        plan: &AclState,
        _state: &StateWriter,
    ) -> Result<AclState> {
        let binding = expand(plan)?;
        let ctx = scoped(ctx, &plan.environment_id);
        let instance = required(&plan.kafka_instance_id, "kafka acl kafka_instance_id")?;
        self.backend.api.create_acl(&ctx, instance, &binding).await?;
        let id = acl_id(&binding);
        tracing::info!(instance, acl = %id, "kafka acl created");
        let canonical = self.lookup(&ctx, instance, &id, Some(&binding)).await?;
        Ok(model::flatten(&canonical, plan))
    }

    #[instrument(skip_all, fields(acl = prior.id.as_str()))]
    async fn read(&self, ctx: &RequestContext, prior: &AclState) -> Result<Option<AclState>> {
        let ctx = scoped(ctx, &prior.environment_id);
        let instance = required(&prior.kafka_instance_id, "kafka acl kafka_instance_id")?;
        let id = AclId::parse(required(&prior.id, "kafka acl id")?)?;
        let hint = prior_binding(prior);
        let binding = found(self.lookup(&ctx, instance, &id, hint.as_ref()).await)?;
        Ok(binding.map(|b| model::flatten(&b, prior)))
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        prior: &AclState,
        plan: &AclState,
        _state: &StateWriter,
    ) -> Result<AclState> {
        let what = format!("kafka acl {}", prior.id.as_str());
        reject_replace(&what, &self.requires_replace(prior, plan))?;
        Ok(prior.clone())
    }

    #[instrument(skip_all, fields(acl = prior.id.as_str()))]
    async fn delete(&self, ctx: &RequestContext, prior: &AclState) -> Result<()> {
        let ctx = scoped(ctx, &prior.environment_id);
        let instance = required(&prior.kafka_instance_id, "kafka acl kafka_instance_id")?;
        let id = AclId::parse(required(&prior.id, "kafka acl id")?)?;
        let hint = prior_binding(prior);
        let Some(binding) = found(self.lookup(&ctx, instance, &id, hint.as_ref()).await)? else {
            return Ok(());
        };
        ignore_not_found(self.backend.api.delete_acls(&ctx, instance, &[binding]).await)
    }

    #[instrument(skip_all, fields(import_id = id))]
    async fn import_state(&self, ctx: &RequestContext, id: &str) -> Result<AclState> {
        let [environment_id, instance_id, acl] =
            parse_import_id(id, ["environment_id", "kafka_instance_id", "acl_id"])?;
        AclId::parse(&acl)?;
        let prior = AclState {
            environment_id: Attr::Known(environment_id),
            kafka_instance_id: Attr::Known(instance_id.clone()),
            id: Attr::Known(acl.clone()),
            ..Default::default()
        };
        self.read(ctx, &prior)
            .await?
            .ok_or_else(|| Error::not_found(format!("kafka acl {} on {}", acl, instance_id)))
    }

    fn requires_replace(&self, prior: &AclState, plan: &AclState) -> Vec<&'static str> {
        let pairs = [
            ("environment_id", &prior.environment_id, &plan.environment_id),
            ("kafka_instance_id", &prior.kafka_instance_id, &plan.kafka_instance_id),
            ("resource_type", &prior.resource_type, &plan.resource_type),
            ("resource_name", &prior.resource_name, &plan.resource_name),
            ("pattern_type", &prior.pattern_type, &plan.pattern_type),
            ("principal", &prior.principal, &plan.principal),
            ("operation_group", &prior.operation_group, &plan.operation_group),
            ("permission", &prior.permission, &plan.permission),
        ];
        pairs.into_iter().filter(|(_, a, b)| changed(*a, *b)).map(|(name, _, _)| name).collect()
    }
}
