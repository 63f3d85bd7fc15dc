use super::{segment, ApiClient, KeyValue, Page};
use crate::api::IntegrationVO;
use crate::client::RequestContext;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const INSTANCES_PATH: &str = "/api/v1/instances";
pub const INSTANCE_INTEGRATIONS_PATH: &str = "/api/v1/instances/integrations";

/// Spec value key carrying the AKU count.
pub const AKU_KEY: &str = "aku";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkVO {
    pub zone: String,
    pub subnet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpecRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_profile: Option<String>,
    #[serde(default)]
    pub values: Vec<KeyValue>,
}

impl InstanceSpecRequest {
    pub fn aku(&self) -> Option<i64> {
        self.values.iter().find(|kv| kv.key == AKU_KEY).and_then(|kv| kv.value.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceCreateRequest {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub provider: String,
    pub region: String,
    pub networks: Vec<NetworkVO>,
    pub spec: InstanceSpecRequest,
    pub acl_enabled: bool,
    #[serde(default)]
    pub integrations: Vec<String>,
    #[serde(default)]
    pub instance_configs: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceBasicUpdate {
    pub display_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfigUpdate {
    pub instance_configs: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpecUpdate {
    pub values: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceIntegrationBinding {
    pub instance_id: String,
    pub integrations: Vec<String>,
}

/// Instance as returned by `GET /api/v1/instances/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceVO {
    pub instance_id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub provider: String,
    pub region: String,
    pub state: String,
    pub networks: Vec<NetworkVO>,
    pub spec: InstanceSpecRequest,
    pub acl_enabled: bool,
    pub gmt_create: Option<DateTime<Utc>>,
    pub gmt_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointVO {
    pub display_name: String,
    pub network_type: String,
    pub protocol: String,
    pub mechanisms: String,
    pub bootstrap_servers: String,
}

fn instance_path(id: &str) -> String {
    format!("{}/{}", INSTANCES_PATH, segment(id))
}

impl ApiClient {
    pub async fn create_instance(
        &self,
        ctx: &RequestContext,
        body: &InstanceCreateRequest,
    ) -> Result<InstanceVO> {
        let op = format!("create kafka instance {}", body.display_name);
        self.post_json(ctx, &op, INSTANCES_PATH, body).await
    }

    pub async fn get_instance(&self, ctx: &RequestContext, id: &str) -> Result<InstanceVO> {
        let op = format!("read kafka instance {}", id);
        self.get_json(ctx, &op, &instance_path(id), &[]).await
    }

    pub async fn delete_instance(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        let op = format!("delete kafka instance {}", id);
        self.delete_unit(ctx, &op, &instance_path(id), &[]).await
    }

    pub async fn update_instance_basic(
        &self,
        ctx: &RequestContext,
        id: &str,
        body: &InstanceBasicUpdate,
    ) -> Result<()> {
        let op = format!("update basic info of kafka instance {}", id);
        self.patch_unit(ctx, &op, &format!("{}/basic", instance_path(id)), Some(body)).await
    }

    pub async fn update_instance_version(
        &self,
        ctx: &RequestContext,
        id: &str,
        version: &str,
    ) -> Result<()> {
        let op = format!("update version of kafka instance {} to {}", id, version);
        let path = format!("{}/versions/{}", instance_path(id), segment(version));
        self.patch_unit::<()>(ctx, &op, &path, None).await
    }

    pub async fn update_instance_configs(
        &self,
        ctx: &RequestContext,
        id: &str,
        body: &InstanceConfigUpdate,
    ) -> Result<()> {
        let op = format!("update configurations of kafka instance {}", id);
        let path = format!("{}/configurations", instance_path(id));
        self.patch_unit(ctx, &op, &path, Some(body)).await
    }

    pub async fn update_instance_spec(
        &self,
        ctx: &RequestContext,
        id: &str,
        body: &InstanceSpecUpdate,
    ) -> Result<()> {
        let op = format!("update compute specs of kafka instance {}", id);
        self.patch_unit(ctx, &op, &format!("{}/spec", instance_path(id)), Some(body)).await
    }

    pub async fn enable_instance_acl(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        let op = format!("enable acl on kafka instance {}", id);
        let path = format!("{}/acls:enable", instance_path(id));
        self.post_unit(ctx, &op, &path, &serde_json::json!({})).await
    }

    pub async fn list_instance_endpoints(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Vec<EndpointVO>> {
        let op = format!("list endpoints of kafka instance {}", id);
        let page: Page<EndpointVO> =
            self.get_json(ctx, &op, &format!("{}/endpoints", instance_path(id)), &[]).await?;
        Ok(page.list)
    }

    pub async fn list_instance_configs(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Vec<KeyValue>> {
        let op = format!("list configurations of kafka instance {}", id);
        let page: Page<KeyValue> =
            self.get_json(ctx, &op, &format!("{}/configurations", instance_path(id)), &[]).await?;
        Ok(page.list)
    }

    pub async fn list_instance_integrations(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Vec<IntegrationVO>> {
        let op = format!("list integrations of kafka instance {}", id);
        let page: Page<IntegrationVO> =
            self.get_json(ctx, &op, &format!("{}/integrations", instance_path(id)), &[]).await?;
        Ok(page.list)
    }

    pub async fn bind_instance_integrations(
        &self,
        ctx: &RequestContext,
        body: &InstanceIntegrationBinding,
    ) -> Result<()> {
        let op = format!(
            "bind integrations {} to kafka instance {}",
            body.integrations.join(","),
            body.instance_id
        );
        self.put_unit(ctx, &op, INSTANCE_INTEGRATIONS_PATH, body).await
    }

    pub async fn unbind_instance_integration(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        integration_id: &str,
    ) -> Result<()> {
        let op = format!("unbind integration {} from kafka instance {}", integration_id, instance_id);
        let path = format!("{}/{}", INSTANCE_INTEGRATIONS_PATH, segment(integration_id));
        self.delete_unit(ctx, &op, &path, &[("instanceId", instance_id.to_string())]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_wire_shape() {
        let req = InstanceCreateRequest {
            display_name: "demo".into(),
            description: None,
            provider: "aliyun".into(),
            region: "cn-hangzhou".into(),
            networks: vec![NetworkVO { zone: "cn-hangzhou-b".into(), subnet: "vsw-1".into() }],
            spec: InstanceSpecRequest {
                version: Some("1.3.10".into()),
                deploy_profile: None,
                values: vec![KeyValue::new(AKU_KEY, "6")],
            },
            acl_enabled: false,
            integrations: vec![],
            instance_configs: vec![],
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["displayName"], "demo");
        assert_eq!(v["networks"][0], json!({"zone": "cn-hangzhou-b", "subnet": "vsw-1"}));
        assert_eq!(v["spec"], json!({"version": "1.3.10", "values": [{"key": "aku", "value": "6"}]}));
        assert_eq!(v["aclEnabled"], false);
        assert!(v.get("description").is_none());
    }

    #[test]
    fn instance_vo_tolerates_sparse_bodies() {
        let vo: InstanceVO = serde_json::from_value(json!({
            "instanceId": "kf-1",
            "state": "Creating",
            "spec": {"values": [{"key": "aku", "value": "6"}]},
            "gmtCreate": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(vo.instance_id, "kf-1");
        assert_eq!(vo.spec.aku(), Some(6));
        assert!(vo.gmt_create.is_some());
        assert!(vo.networks.is_empty());
    }
}
