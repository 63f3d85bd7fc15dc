use super::common::{format_principal, parse_principal};
use super::Attr;
use crate::api::{AccessControl, AclBinding, AclFilter, ResourcePattern};
use crate::error::{Error, Result};
use crate::id::AclId;
use serde::{Deserialize, Serialize};

/// The only resource name allowed for `CLUSTER` bindings.
pub const CLUSTER_RESOURCE_NAME: &str = "kafka-cluster";

const RESOURCE_TYPES: &[&str] = &["TOPIC", "GROUP", "CLUSTER", "TRANSACTIONAL_ID"];
const PATTERN_TYPES: &[&str] = &["LITERAL", "PREFIXED"];
const OPERATION_GROUPS: &[&str] = &["ALL", "PRODUCE", "CONSUME"];
const PERMISSIONS: &[&str] = &["ALLOW", "DENY"];

/// `kafka_acl` state. Every attribute is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclState {
    pub environment_id: Attr<String>,
    pub kafka_instance_id: Attr<String>,
    pub id: Attr<String>,
    pub resource_type: Attr<String>,
    pub resource_name: Attr<String>,
    pub pattern_type: Attr<String>,
    pub principal: Attr<String>,
    pub operation_group: Attr<String>,
    pub permission: Attr<String>,
}

fn one_of<'a>(value: &'a Attr<String>, field: &str, allowed: &[&str]) -> Result<&'a str> {
    match value.value() {
        Some(v) if allowed.contains(&v.as_str()) => Ok(v.as_str()),
        Some(v) => Err(Error::validation(format!(
            "kafka acl: {} must be one of {}, got {:?}",
            field,
            allowed.join("|"),
            v
        ))),
        None => Err(Error::validation(format!("kafka acl: {} is required", field))),
    }
}

/// Validated binding for the desired state.
pub fn expand(plan: &AclState) -> Result<AclBinding> {
    let resource_type = one_of(&plan.resource_type, "resource_type", RESOURCE_TYPES)?;
    let pattern_type = one_of(&plan.pattern_type, "pattern_type", PATTERN_TYPES)?;
    let operation_group = one_of(&plan.operation_group, "operation_group", OPERATION_GROUPS)?;
    let permission = one_of(&plan.permission, "permission", PERMISSIONS)?;
    let resource_name = plan
        .resource_name
        .non_empty()
        .ok_or_else(|| Error::validation("kafka acl: resource_name is required"))?;
    if resource_type == "CLUSTER" && resource_name != CLUSTER_RESOURCE_NAME {
        return Err(Error::validation(format!(
            "kafka acl: resource_name must be {:?} when resource_type is CLUSTER, got {:?}",
            CLUSTER_RESOURCE_NAME, resource_name
        )));
    }
    let principal = plan
        .principal
        .value()
        .ok_or_else(|| Error::validation("kafka acl: principal is required"))?;
    let user = parse_principal(principal)?;

    Ok(AclBinding {
        access_control: AccessControl {
            user,
            permission_type: permission.to_string(),
            operation_group: operation_group.to_string(),
        },
        resource_pattern: ResourcePattern {
            resource_type: resource_type.to_string(),
            name: resource_name.to_string(),
            pattern_type: pattern_type.to_string(),
        },
    })
}

pub fn acl_id(binding: &AclBinding) -> AclId {
    AclId::new(
        binding.access_control.user.clone(),
        binding.resource_pattern.resource_type.clone(),
        binding.access_control.permission_type.clone(),
        binding.resource_pattern.name.clone(),
    )
}

pub fn filter(id: &AclId) -> AclFilter {
    AclFilter {
        user: id.user.clone(),
        resource_type: id.resource_type.clone(),
        permission_type: id.permission_type.clone(),
        resource_name: id.resource_name.clone(),
    }
}

/// Binding recorded in a prior state, if complete enough to disambiguate lookups.
pub fn prior_binding(prior: &AclState) -> Option<AclBinding> {
    expand(prior).ok()
}

pub fn flatten(binding: &AclBinding, prior: &AclState) -> AclState {
    AclState {
        environment_id: prior.environment_id.clone().or_prior(&Attr::Null),
        kafka_instance_id: prior.kafka_instance_id.clone().or_prior(&Attr::Null),
        id: Attr::Known(acl_id(binding).generate()),
        resource_type: Attr::Known(binding.resource_pattern.resource_type.clone()),
        resource_name: Attr::Known(binding.resource_pattern.name.clone()),
        pattern_type: Attr::Known(binding.resource_pattern.pattern_type.clone()),
        principal: Attr::Known(format_principal(&binding.access_control.user)),
        operation_group: Attr::Known(binding.access_control.operation_group.clone()),
        permission: Attr::Known(binding.access_control.permission_type.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(resource_type: &str, name: &str, principal: &str) -> AclState {
        AclState {
            resource_type: resource_type.into(),
            resource_name: name.into(),
            pattern_type: "LITERAL".into(),
            principal: principal.into(),
            operation_group: "CONSUME".into(),
            permission: "ALLOW".into(),
            ..Default::default()
        }
    }

    #[test]
    fn expand_and_id() {
        let binding = expand(&plan("TOPIC", "orders", "User:alice")).unwrap();
        assert_eq!(binding.access_control.user, "alice");
        assert_eq!(acl_id(&binding).generate(), "alice|TOPIC|ALLOW|orders");
        let state = flatten(&binding, &AclState::default());
        assert_eq!(state.principal, Attr::from("User:alice"));
        assert_eq!(state.id, Attr::from("alice|TOPIC|ALLOW|orders"));
    }

    #[test]
    fn cluster_requires_literal_name() {
        let err = expand(&plan("CLUSTER", "not-kafka-cluster", "User:alice")).unwrap_err();
        assert!(err.is_validation());
        assert!(expand(&plan("CLUSTER", "kafka-cluster", "User:alice")).is_ok());
    }

    #[test]
    fn invalid_principal_and_enums_rejected() {
        assert!(expand(&plan("TOPIC", "orders", "alice")).is_err());
        assert!(expand(&plan("TOPIC", "orders", "User:")).is_err());
        assert!(expand(&plan("QUEUE", "orders", "User:alice")).is_err());
    }
}
