use super::{changed, found, ignore_not_found, reject_replace, required, scoped};
use super::{Backend, Controller, ResourceKind};
use crate::api::{InstanceIntegrationBinding, InstanceVO};
use crate::client::RequestContext;
use crate::error::{Error, Result};
use crate::id::parse_import_id;
use crate::model::common::{removed_keys, timeouts_of};
use crate::model::instance::{self as model, expand_basic, expand_configs, expand_create, expand_spec};
use crate::model::{Attr, ComputeSpecs, InstanceDetails, InstanceState};
use crate::state::StateWriter;
use crate::waiter::{Waiter, AVAILABLE, CREATING, DELETING};
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

/// `kafka_instance`.
///
/// Updates run in a fixed order: basic fields, ACL enable, integrations, configs,
/// version, AKU. Each step waits for the cluster to be `Available` again and saves
/// state before the next one starts.
#[derive(Debug, Clone)]
pub struct InstanceController {
    backend: Backend,
}

fn cluster(id: &str) -> String {
    format!("Kafka Cluster {}", id)
}

/// State saved right after the create call, before provisioning finishes.
fn pending_state(plan: &InstanceState, id: &str) -> InstanceState {
    InstanceState {
        id: Attr::Known(id.to_string()),
        endpoints: Attr::Null,
        instance_status: Attr::Known(CREATING.to_string()),
        created_at: Attr::Null,
        last_updated: Attr::Null,
        ..plan.clone()
    }
}

fn set_specs(state: &mut InstanceState, apply: impl FnOnce(&mut ComputeSpecs)) {
    let mut specs = state.compute_specs.value().cloned().unwrap_or_default();
    apply(&mut specs);
    state.compute_specs = Attr::Known(specs);
}

fn basic_changed(prior: &InstanceState, plan: &InstanceState) -> bool {
    let name = !plan.name.is_unknown() && plan.name.as_str() != prior.name.as_str();
    let description =
        !plan.description.is_unknown() && plan.description.as_str() != prior.description.as_str();
    name || description
}

impl InstanceController {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// The instance with its integrations, endpoints and configs.
    pub async fn read_details(&self, ctx: &RequestContext, id: &str) -> Result<InstanceDetails> {
        let api = &self.backend.api;
        let instance = api.get_instance(ctx, id).await?;
        let integrations = api.list_instance_integrations(ctx, id).await?;
        let endpoints = api.list_instance_endpoints(ctx, id).await?;
        let configs = api.list_instance_configs(ctx, id).await?;
        Ok(InstanceDetails { instance, integrations, endpoints, configs })
    }

    async fn wait_available(&self, ctx: &RequestContext, id: &str, timeout: Duration) -> Result<()> {
        let api = &self.backend.api;
        Waiter::to_provision(cluster(id), timeout)
            .configured(&self.backend.waits)
            .wait(ctx, move || async move {
                let vo: InstanceVO = api.get_instance(ctx, id).await?;
                let state = vo.state.clone();
                Ok((vo, state))
            })
            .await?;
        Ok(())
    }

    async fn wait_deleted(&self, ctx: &RequestContext, id: &str, timeout: Duration) -> Result<()> {
        let api = &self.backend.api;
        Waiter::to_deleted(cluster(id), timeout)
            .configured(&self.backend.waits)
            .wait(ctx, move || async move {
                let vo = api.get_instance(ctx, id).await?;
                let state = vo.state.clone();
                Ok((vo, state))
            })
            .await?;
        Ok(())
    }

    /// Wait for the step to settle, then record how far the update got.
    async fn settle(
        &self,
        ctx: &RequestContext,
        id: &str,
        timeout: Duration,
        current: &InstanceState,
        state: &StateWriter,
    ) -> Result<()> {
        self.wait_available(ctx, id, timeout).await?;
        state.save(current).await
    }

    /// Reject updates that can never succeed, before any request is made.
    fn validate_update(&self, id: &str, prior: &InstanceState, plan: &InstanceState) -> Result<()> {
        let what = format!("kafka instance {}", id);
        reject_replace(&what, &self.requires_replace(prior, plan))?;
        if prior.acl_enabled() && !plan.acl.is_unknown() && !plan.acl_enabled() {
            return Err(Error::validation(format!(
                "{}: acl cannot be disabled once it has been enabled",
                what
            )));
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
        if let Some(aku) = plan.aku() {
            if aku <= 0 {
                return Err(Error::validation(format!("{}: aku must be positive, got {}", what, aku)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Controller for InstanceController {
    type State = InstanceState;

    const KIND: ResourceKind = ResourceKind::KafkaInstance;

    #[instrument(skip_all, fields(name = plan.name.as_str()))]
    async fn create(
        &self,
        ctx: &RequestContext,
        plan: &InstanceState,
        state: &StateWriter,
    ) -> Result<InstanceState> {
        let ctx = scoped(ctx, &plan.environment_id);
        let timeout = timeouts_of(&plan.timeouts).create()?;
        let request = expand_create(plan)?;

        let created = self.backend.api.create_instance(&ctx, &request).await?;
        let id = created.instance_id;
        if id.is_empty() {
            return Err(Error::validation(format!(
                "create kafka instance {}: server returned no instance id",
                request.display_name
            )));
        }
        tracing::info!(instance = %id, "kafka instance created, waiting until available");
        state.save(&pending_state(plan, &id)).await?;

        self.wait_available(&ctx, &id, timeout).await?;
        let details = self.read_details(&ctx, &id).await?;
        Ok(model::flatten(&details, plan))
    }

    #[instrument(skip_all, fields(instance = prior.id.as_str()))]
    async fn read(&self, ctx: &RequestContext, prior: &InstanceState) -> Result<Option<InstanceState>> {
        let ctx = scoped(ctx, &prior.environment_id);
        let id = required(&prior.id, "kafka instance id")?;
        let details = found(self.read_details(&ctx, id).await)?;
        if details.is_none() {
            tracing::info!(instance = %id, "kafka instance is gone, removing from state");
        }
        Ok(details.map(|d| model::flatten(&d, prior)))
    }

    #[instrument(skip_all, fields(instance = prior.id.as_str()))]
    async fn update(
        &self,
        ctx: &RequestContext,
        prior: &InstanceState,
        plan: &InstanceState,
        state: &StateWriter,
    ) -> Result<InstanceState> {
        let ctx = scoped(ctx, &plan.environment_id);
        let id = required(&prior.id, "kafka instance id")?;
        self.validate_update(id, prior, plan)?;
        let timeout = timeouts_of(&plan.timeouts).update()?;
        let api = &self.backend.api;

        let live = api.get_instance(&ctx, id).await?;
        if live.state != AVAILABLE {
            return Err(Error::validation(format!(
                "kafka instance {}: cannot update while status is {}; retry once it is {}",
                id, live.state, AVAILABLE
            )));
        }

        let mut current = prior.clone();

        if basic_changed(prior, plan) {
            tracing::info!(instance = %id, "updating name and description");
            api.update_instance_basic(&ctx, id, &expand_basic(plan)).await?;
            current.name = plan.name.clone();
            current.description = plan.description.clone();
            self.settle(&ctx, id, timeout, &current, state).await?;
        }

        if !current.acl_enabled() && plan.acl_enabled() {
            tracing::info!(instance = %id, "enabling acl");
            api.enable_instance_acl(&ctx, id).await?;
            current.acl = Attr::Known(true);
            self.settle(&ctx, id, timeout, &current, state).await?;
        }

        if !plan.integrations.is_unknown() {
            let desired = plan.integration_ids();
            let existing = current.integration_ids();
            let added: Vec<String> =
                desired.iter().filter(|i| !existing.contains(i)).cloned().collect();
            let removed: Vec<String> =
                existing.iter().filter(|i| !desired.contains(i)).cloned().collect();
            if !added.is_empty() || !removed.is_empty() {
                tracing::info!(instance = %id, added = added.len(), removed = removed.len(), "updating integrations");
                if !added.is_empty() {
                    let binding =
                        InstanceIntegrationBinding { instance_id: id.to_string(), integrations: added };
                    api.bind_instance_integrations(&ctx, &binding).await?;
                }
                for integration in &removed {
                    api.unbind_instance_integration(&ctx, id, integration).await?;
                }
                current.integrations = plan.integrations.clone();
                self.settle(&ctx, id, timeout, &current, state).await?;
            }
        }

        if !plan.configs.is_unknown() && plan.config_map() != current.config_map() {
            tracing::info!(instance = %id, "updating instance configs");
            api.update_instance_configs(&ctx, id, &expand_configs(plan)).await?;
            current.configs = plan.configs.clone();
            self.settle(&ctx, id, timeout, &current, state).await?;
        }

        if let Some(version) = plan.version() {
            if Some(version) != current.version() {
                tracing::info!(instance = %id, version, "upgrading kafka version");
                api.update_instance_version(&ctx, id, version).await?;
                set_specs(&mut current, |s| s.version = Attr::Known(version.to_string()));
                self.settle(&ctx, id, timeout, &current, state).await?;
            }
        }

        if let Some(aku) = plan.aku() {
            if Some(aku) != current.aku() {
                tracing::info!(instance = %id, aku, "resizing instance");
                api.update_instance_spec(&ctx, id, &expand_spec(plan)?).await?;
                set_specs(&mut current, |s| s.aku = Attr::Known(aku));
                self.settle(&ctx, id, timeout, &current, state).await?;
            }
        }

        let details = self.read_details(&ctx, id).await?;
        Ok(model::flatten(&details, plan))
    }

    #[instrument(skip_all, fields(instance = prior.id.as_str()))]
    async fn delete(&self, ctx: &RequestContext, prior: &InstanceState) -> Result<()> {
        let ctx = scoped(ctx, &prior.environment_id);
        let id = required(&prior.id, "kafka instance id")?;
        let timeout = timeouts_of(&prior.timeouts).delete()?;

        let Some(live) = found(self.backend.api.get_instance(&ctx, id).await)? else {
            tracing::info!(instance = %id, "kafka instance already gone");
            return Ok(());
        };
        if live.state == DELETING {
            tracing::info!(instance = %id, "kafka instance already deleting");
        } else {
            ignore_not_found(self.backend.api.delete_instance(&ctx, id).await)?;
        }
        self.wait_deleted(&ctx, id, timeout).await
    }

    #[instrument(skip_all, fields(import_id = id))]
    async fn import_state(&self, ctx: &RequestContext, id: &str) -> Result<InstanceState> {
        let [environment_id, instance_id] = parse_import_id(id, ["environment_id", "instance_id"])?;
        let prior = InstanceState {
            environment_id: Attr::Known(environment_id),
            id: Attr::Known(instance_id.clone()),
            configs: Attr::Unknown,
            ..Default::default()
        };
        self.read(ctx, &prior)
            .await?
            .ok_or_else(|| Error::not_found(format!("kafka instance {}", instance_id)))
    }

    fn requires_replace(&self, prior: &InstanceState, plan: &InstanceState) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if changed(&prior.environment_id, &plan.environment_id) {
            fields.push("environment_id");
        }
        if changed(&prior.cloud_provider, &plan.cloud_provider) {
            fields.push("cloud_provider");
        }
        if changed(&prior.region, &plan.region) {
            fields.push("region");
        }
        if changed(&prior.networks, &plan.networks) {
            fields.push("networks");
        }
        let prior_profile = prior.compute_specs.value().map(|s| s.deploy_profile.clone());
        let plan_profile = plan.compute_specs.value().map(|s| s.deploy_profile.clone());
        if let (Some(prior_profile), Some(plan_profile)) = (prior_profile, plan_profile) {
            if plan_profile.is_known() && changed(&prior_profile, &plan_profile) {
                fields.push("compute_specs.deploy_profile");
            }
        }
        fields
    }
}
