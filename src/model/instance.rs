use super::common::{
    configs_to_wire, format_time, managed_configs, provider_from_wire, provider_to_wire,
    status_from_wire, ConfigMap, Timeouts,
};
use super::{align_order, Attr};
use crate::api::instance::AKU_KEY;
use crate::api::{
    EndpointVO, InstanceBasicUpdate, InstanceConfigUpdate, InstanceCreateRequest, InstanceSpecRequest,
    InstanceSpecUpdate, InstanceVO, IntegrationVO, KeyValue, NetworkVO,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    pub zone: String,
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeSpecs {
    pub aku: Attr<i64>,
    pub version: Attr<String>,
    pub deploy_profile: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub display_name: String,
    pub network_type: String,
    pub protocol: String,
    pub mechanisms: String,
    pub bootstrap_servers: String,
}

impl From<&EndpointVO> for Endpoint {
    fn from(vo: &EndpointVO) -> Self {
        Self {
            display_name: vo.display_name.clone(),
            network_type: vo.network_type.clone(),
            protocol: vo.protocol.clone(),
            mechanisms: vo.mechanisms.clone(),
            bootstrap_servers: vo.bootstrap_servers.clone(),
        }
    }
}

/// `kafka_instance` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceState {
    pub environment_id: Attr<String>,
    pub id: Attr<String>,
    pub name: Attr<String>,
    pub description: Attr<String>,
    pub cloud_provider: Attr<String>,
    pub region: Attr<String>,
    pub networks: Attr<Vec<Network>>,
    pub compute_specs: Attr<ComputeSpecs>,
    pub configs: Attr<ConfigMap>,
    pub acl: Attr<bool>,
    pub integrations: Attr<Vec<String>>,
    pub endpoints: Attr<Vec<Endpoint>>,
    pub instance_status: Attr<String>,
    pub created_at: Attr<String>,
    pub last_updated: Attr<String>,
    pub timeouts: Attr<Timeouts>,
}

impl InstanceState {
    pub fn aku(&self) -> Option<i64> {
        self.compute_specs.value().and_then(|s| s.aku.value().copied())
    }

    pub fn version(&self) -> Option<&str> {
        self.compute_specs.value().and_then(|s| s.version.non_empty())
    }

    pub fn acl_enabled(&self) -> bool {
        self.acl.value_or(false)
    }

    pub fn integration_ids(&self) -> Vec<String> {
        self.integrations.value_or(Vec::new())
    }

    pub fn config_map(&self) -> ConfigMap {
        self.configs.value_or(ConfigMap::new())
    }
}

/// Everything a full instance read collects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceDetails {
    pub instance: InstanceVO,
    pub integrations: Vec<IntegrationVO>,
    pub endpoints: Vec<EndpointVO>,
    pub configs: Vec<KeyValue>,
}

fn required<'a>(value: &'a Attr<String>, field: &str) -> Result<&'a str> {
    value
        .non_empty()
        .ok_or_else(|| Error::validation(format!("kafka instance: {} is required", field)))
}

fn networks_to_wire(networks: &[Network]) -> Result<Vec<NetworkVO>> {
    if networks.is_empty() {
        return Err(Error::validation("kafka instance: at least one network is required"));
    }
    networks
        .iter()
        .map(|n| match n.subnets.as_slice() {
            [subnet] => Ok(NetworkVO { zone: n.zone.clone(), subnet: subnet.clone() }),
            other => Err(Error::validation(format!(
                "kafka instance: network in zone {} must have exactly one subnet, got {}",
                n.zone,
                other.len()
            ))),
        })
        .collect()
}

fn networks_from_wire(networks: &[NetworkVO]) -> Vec<Network> {
    let mut out: Vec<Network> = Vec::new();
    for vo in networks {
        match out.iter_mut().find(|n| n.zone == vo.zone) {
            Some(n) => n.subnets.push(vo.subnet.clone()),
            None => out.push(Network { zone: vo.zone.clone(), subnets: vec![vo.subnet.clone()] }),
        }
    }
    out
}

fn aku_values(aku: i64) -> Vec<KeyValue> {
    vec![KeyValue::new(AKU_KEY, aku.to_string())]
}

/// Desired state to the create body.
pub fn expand_create(plan: &InstanceState) -> Result<InstanceCreateRequest> {
    let name = required(&plan.name, "name")?;
    let provider = required(&plan.cloud_provider, "cloud_provider")?;
    let region = required(&plan.region, "region")?;
    let networks = networks_to_wire(plan.networks.value().map(Vec::as_slice).unwrap_or_default())?;
    let specs = plan
        .compute_specs
        .value()
        .ok_or_else(|| Error::validation("kafka instance: compute_specs is required"))?;
    let aku = match specs.aku.value() {
        Some(aku) if *aku > 0 => *aku,
        Some(aku) => {
            return Err(Error::validation(format!("kafka instance: aku must be positive, got {}", aku)))
        }
        None => return Err(Error::validation("kafka instance: compute_specs.aku is required")),
    };

    Ok(InstanceCreateRequest {
        display_name: name.to_string(),
        description: plan.description.value().cloned(),
        provider: provider_to_wire(provider),
        region: region.to_string(),
        networks,
        spec: InstanceSpecRequest {
            version: specs.version.non_empty().map(str::to_string),
            deploy_profile: specs.deploy_profile.non_empty().map(str::to_string),
            values: aku_values(aku),
        },
        acl_enabled: plan.acl_enabled(),
        integrations: plan.integration_ids(),
        instance_configs: configs_to_wire(&plan.config_map()),
    })
}

pub fn expand_basic(plan: &InstanceState) -> InstanceBasicUpdate {
    InstanceBasicUpdate {
        display_name: plan.name.as_str().to_string(),
        description: plan.description.as_str().to_string(),
    }
}

pub fn expand_configs(plan: &InstanceState) -> InstanceConfigUpdate {
    InstanceConfigUpdate { instance_configs: configs_to_wire(&plan.config_map()) }
}

pub fn expand_spec(plan: &InstanceState) -> Result<InstanceSpecUpdate> {
    match plan.aku() {
        Some(aku) if aku > 0 => Ok(InstanceSpecUpdate { values: aku_values(aku) }),
        _ => Err(Error::validation("kafka instance: compute_specs.aku must be a positive number")),
    }
}

/// Server view to state. Values the server does not own are taken from `prior`.
pub fn flatten(details: &InstanceDetails, prior: &InstanceState) -> InstanceState {
    let vo = &details.instance;
    let prior_specs = prior.compute_specs.value().cloned().unwrap_or_default();

    let description = match vo.description.as_deref() {
        Some(d) if !d.is_empty() => Attr::Known(d.to_string()),
        _ if prior.description.value().is_some_and(String::is_empty) => Attr::Known(String::new()),
        _ => Attr::Null,
    };

    let compute_specs = ComputeSpecs {
        aku: vo.spec.aku().into(),
        version: vo.spec.version.clone().into(),
        deploy_profile: Attr::from(vo.spec.deploy_profile.clone())
            .or_prior(&prior_specs.deploy_profile),
    };

    let server_integrations: Vec<String> =
        details.integrations.iter().map(|i| i.id.clone()).collect();
    let integrations = if server_integrations.is_empty() && !prior.integrations.is_known() {
        Attr::Null
    } else {
        Attr::Known(align_order(server_integrations, &prior.integration_ids()))
    };

    let endpoints = if details.endpoints.is_empty() {
        Attr::Null
    } else {
        Attr::Known(details.endpoints.iter().map(Endpoint::from).collect())
    };

    InstanceState {
        environment_id: prior.environment_id.clone().or_prior(&Attr::Null),
        id: Attr::Known(vo.instance_id.clone()),
        name: Attr::Known(vo.display_name.clone()),
        description,
        cloud_provider: Attr::Known(provider_from_wire(&vo.provider)),
        region: Attr::Known(vo.region.clone()),
        networks: Attr::Known(networks_from_wire(&vo.networks)),
        compute_specs: Attr::Known(compute_specs),
        configs: managed_configs(&details.configs, &prior.configs),
        acl: Attr::Known(vo.acl_enabled),
        integrations,
        endpoints,
        instance_status: Attr::Known(status_from_wire(&vo.state).to_string()),
        created_at: format_time(&vo.gmt_create),
        last_updated: format_time(&vo.gmt_modified),
        timeouts: prior.timeouts.clone().or_prior(&Attr::Null),
    }
}
