//! ACL bindings.
//!
//! There is no `GET /acls/{id}`: a binding is found by reissuing the filtered list query
//! built from its composite id and keeping exact matches.

use super::{segment, ApiClient, Page};
use crate::client::RequestContext;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessControl {
    pub user: String,
    pub permission_type: String,
    pub operation_group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourcePattern {
    pub resource_type: String,
    pub name: String,
    pub pattern_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AclBinding {
    pub access_control: AccessControl,
    pub resource_pattern: ResourcePattern,
}

/// Query for `GET /acls`, decoded from a composite ACL id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclFilter {
    pub user: String,
    pub resource_type: String,
    pub permission_type: String,
    pub resource_name: String,
}

impl AclFilter {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("exactUser", self.user.clone()),
            ("resourceTypes", self.resource_type.clone()),
            ("permissionType", self.permission_type.clone()),
            ("fuzzyResourceName", self.resource_name.clone()),
        ]
    }

    /// The server matches the resource name fuzzily; keep exact hits only.
    pub fn matches(&self, binding: &AclBinding) -> bool {
        binding.access_control.user == self.user
            && binding.resource_pattern.resource_type == self.resource_type
            && binding.access_control.permission_type == self.permission_type
            && binding.resource_pattern.name == self.resource_name
    }
}

fn acls_path(instance_id: &str) -> String {
    format!("/api/v1/instances/{}/acls", segment(instance_id))
}

impl ApiClient {
    pub async fn create_acl(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        binding: &AclBinding,
    ) -> Result<()> {
        let op = format!(
            "create kafka acl for {} on {} {} (instance {})",
            binding.access_control.user,
            binding.resource_pattern.resource_type,
            binding.resource_pattern.name,
            instance_id
        );
        self.post_unit(ctx, &op, &acls_path(instance_id), binding).await
    }

    /// Every binding the filter matches exactly.
    pub async fn list_acls(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        filter: &AclFilter,
    ) -> Result<Vec<AclBinding>> {
        let op = format!("list kafka acls on instance {}", instance_id);
        let query = filter.query();
        let page: Page<AclBinding> =
            self.get_json(ctx, &op, &acls_path(instance_id), &query).await?;
        Ok(page.list.into_iter().filter(|b| filter.matches(b)).collect())
    }

    /// Exactly one binding must match; zero is `NotFound`.
    ///
    /// Several matches (differing only by pattern type or operation group) are narrowed
    /// with `hint`, typically the prior state's binding.
    pub async fn get_acl(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        filter: &AclFilter,
        hint: Option<&AclBinding>,
    ) -> Result<AclBinding> {
        let mut found = self.list_acls(ctx, instance_id, filter).await?;
        if found.len() > 1 {
            if let Some(hint) = hint {
                found.retain(|b| {
                    b.resource_pattern.pattern_type == hint.resource_pattern.pattern_type
                        && b.access_control.operation_group == hint.access_control.operation_group
                });
            }
        }
        let what = format!(
            "kafka acl {}|{}|{}|{} on instance {}",
            filter.user, filter.resource_type, filter.permission_type, filter.resource_name, instance_id
        );
        match found.len() {
            0 => Err(Error::not_found(what)),
            1 => Ok(found.remove(0)),
            n => Err(Error::validation(format!("{} is ambiguous: {} bindings match", what, n))),
        }
    }

    pub async fn delete_acls(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        bindings: &[AclBinding],
    ) -> Result<()> {
        let op = format!("delete {} kafka acl(s) on instance {}", bindings.len(), instance_id);
        let path = format!("{}/batch:delete", acls_path(instance_id));
        self.post_unit(ctx, &op, &path, bindings).await
    }
}
