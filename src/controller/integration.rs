use super::{changed, found, ignore_not_found, reject_replace, required, scoped};
use super::{Backend, Controller, ResourceKind};
use crate::client::RequestContext;
use crate::error::{Error, Result};
use crate::id::parse_import_id;
use crate::model::integration::{self as model, expand};
use crate::model::{Attr, IntegrationState};
use crate::state::StateWriter;
use async_trait::async_trait;
use tracing::instrument;

/// `integration`: an external metrics or Kafka endpoint instances can be bound to.
#[derive(Debug, Clone)]
pub struct IntegrationController {
    backend: Backend,
}

impl IntegrationController {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Controller for IntegrationController {
    type State = IntegrationState;

    const KIND: ResourceKind = ResourceKind::Integration;

    #[instrument(skip_all, fields(name = plan.name.as_str()))]
    async fn create(
        &self,
        ctx: &RequestContext,
        plan: &IntegrationState,
        _state: &StateWriter,
    ) -> Result<IntegrationState> {
        let request = expand(plan)?;
        let ctx = scoped(ctx, &plan.environment_id);
        let created = self.backend.api.create_integration(&ctx, &request).await?;
        tracing::info!(integration = %created.id, kind = %request.integration_type, "integration created");
        let integration = self.backend.api.get_integration(&ctx, &created.id).await?;
        Ok(model::flatten(&integration, plan))
    }

    #[instrument(skip_all, fields(integration = prior.id.as_str()))]
    async fn read(
        &self,
        ctx: &RequestContext,
        prior: &IntegrationState,
    ) -> Result<Option<IntegrationState>> {
        let ctx = scoped(ctx, &prior.environment_id);
        let id = required(&prior.id, "integration id")?;
        let integration = found(self.backend.api.get_integration(&ctx, id).await)?;
        Ok(integration.map(|i| model::flatten(&i, prior)))
    }

    #[instrument(skip_all, fields(integration = prior.id.as_str()))]
    async fn update(
        &self,
        ctx: &RequestContext,
        prior: &IntegrationState,
        plan: &IntegrationState,
        _state: &StateWriter,
    ) -> Result<IntegrationState> {
        let ctx = scoped(ctx, &plan.environment_id);
        let id = required(&prior.id, "integration id")?;
        reject_replace(&format!("integration {}", id), &self.requires_replace(prior, plan))?;
        let request = expand(plan)?;
        self.backend.api.update_integration(&ctx, id, &request).await?;
        let integration = self.backend.api.get_integration(&ctx, id).await?;
        Ok(model::flatten(&integration, plan))
    }

    #[instrument(skip_all, fields(integration = prior.id.as_str()))]
    async fn delete(&self, ctx: &RequestContext, prior: &IntegrationState) -> Result<()> {
        let ctx = scoped(ctx, &prior.environment_id);
        let id = required(&prior.id, "integration id")?;
        if found(self.backend.api.get_integration(&ctx, id).await)?.is_none() {
            return Ok(());
        }
        ignore_not_found(self.backend.api.delete_integration(&ctx, id).await)
    }

    #[instrument(skip_all, fields(import_id = id))]
    async fn import_state(&self, ctx: &RequestContext, id: &str) -> Result<IntegrationState> {
        let [environment_id, integration_id] =
            parse_import_id(id, ["environment_id", "integration_id"])?;
        let prior = IntegrationState {
            environment_id: Attr::Known(environment_id),
            id: Attr::Known(integration_id.clone()),
            ..Default::default()
        };
        self.read(ctx, &prior)
            .await?
            .ok_or_else(|| Error::not_found(format!("integration {}", integration_id)))
    }

    fn requires_replace(&self, prior: &IntegrationState, plan: &IntegrationState) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if changed(&prior.environment_id, &plan.environment_id) {
            fields.push("environment_id");
        }
        if changed(&prior.integration_type, &plan.integration_type) {
            fields.push("type");
        }
        fields
    }
}
