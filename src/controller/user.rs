use super::{changed, found, ignore_not_found, reject_replace, required, scoped};
use super::{Backend, Controller, ResourceKind};
use crate::client::RequestContext;
use crate::error::{Error, Result};
use crate::id::parse_import_id;
use crate::model::user::{self as model, expand};
use crate::model::{Attr, UserState};
use crate::state::StateWriter;
use async_trait::async_trait;
use tracing::instrument;

/// `kafka_user`. Every attribute forces replacement.
#[derive(Debug, Clone)]
pub struct UserController {
    backend: Backend,
}

impl UserController {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Controller for UserController {
    type State = UserState;

    const KIND: ResourceKind = ResourceKind::KafkaUser;

    #[instrument(skip_all, fields(user = plan.username.as_str()))]
    async fn create(
        &self,
        ctx: &RequestContext,
        plan: &UserState,
        _state: &StateWriter,
    ) -> Result<UserState> {
        let ctx = scoped(ctx, &plan.environment_id);
        let instance = required(&plan.kafka_instance_id, "kafka user kafka_instance_id")?;
        let request = expand(plan)?;
        self.backend.api.create_user(&ctx, instance, &request).await?;
        tracing::info!(instance, user = %request.name, "kafka user created");
        let user = self.backend.api.get_user(&ctx, instance, &request.name).await?;
        Ok(model::flatten(&user, plan))
    }

    #[instrument(skip_all, fields(user = prior.username.as_str()))]
    async fn read(&self, ctx: &RequestContext, prior: &UserState) -> Result<Option<UserState>> {
        let ctx = scoped(ctx, &prior.environment_id);
        let instance = required(&prior.kafka_instance_id, "kafka user kafka_instance_id")?;
        let name = required(&prior.username, "kafka user username")?;
        let user = found(self.backend.api.get_user(&ctx, instance, name).await)?;
        Ok(user.map(|u| model::flatten(&u, prior)))
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        prior: &UserState,
        plan: &UserState,
        _state: &StateWriter,
    ) -> Result<UserState> {
        let what = format!("kafka user {}", prior.username.as_str());
        reject_replace(&what, &self.requires_replace(prior, plan))?;
        Ok(UserState { password: plan.password.clone().or_prior(&prior.password), ..prior.clone() })
    }

    #[instrument(skip_all, fields(user = prior.username.as_str()))]
    async fn delete(&self, ctx: &RequestContext, prior: &UserState) -> Result<()> {
        let ctx = scoped(ctx, &prior.environment_id);
        let instance = required(&prior.kafka_instance_id, "kafka user kafka_instance_id")?;
        let name = required(&prior.username, "kafka user username")?;
        if found(self.backend.api.get_user(&ctx, instance, name).await)?.is_none() {
            return Ok(());
        }
        ignore_not_found(self.backend.api.delete_user(&ctx, instance, name).await)
    }

    #[instrument(skip_all, fields(import_id = id))]
    async fn import_state(&self, ctx: &RequestContext, id: &str) -> Result<UserState> {
        let [environment_id, instance_id, username] =
            parse_import_id(id, ["environment_id", "kafka_instance_id", "username"])?;
        let prior = UserState {
            environment_id: Attr::Known(environment_id),
            kafka_instance_id: Attr::Known(instance_id.clone()),
            username: Attr::Known(username.clone()),
            password: Attr::Null,
        };
        self.read(ctx, &prior)
            .await?
            .ok_or_else(|| Error::not_found(format!("kafka user {}/{}", instance_id, username)))
    }

    fn requires_replace(&self, prior: &UserState, plan: &UserState) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if changed(&prior.environment_id, &plan.environment_id) {
            fields.push("environment_id");
        }
        if changed(&prior.kafka_instance_id, &plan.kafka_instance_id) {
            fields.push("kafka_instance_id");
        }
        if changed(&prior.username, &plan.username) {
            fields.push("username");
        }
        if changed(&prior.password, &plan.password) {
            fields.push("password");
        }
        fields
    }
}
