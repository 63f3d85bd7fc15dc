use super::{segment, ApiClient, KeyValue};
use crate::client::RequestContext;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const INTEGRATIONS_PATH: &str = "/api/v1/integrations";

/// Create and update body. `type` is ignored by the server on update.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    pub endpoint: String,
    #[serde(default)]
    pub config: Vec<KeyValue>,
}

impl std::fmt::Debug for IntegrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&str> = self.config.iter().map(|kv| kv.key.as_str()).collect();
        f.debug_struct("IntegrationRequest")
            .field("name", &self.name)
            .field("type", &self.integration_type)
            .field("endpoint", &self.endpoint)
            .field("config_keys", &keys)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntegrationVO {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    pub endpoint: String,
    pub config: Vec<KeyValue>,
    pub gmt_create: Option<DateTime<Utc>>,
    pub gmt_modified: Option<DateTime<Utc>>,
}

fn integration_path(id: &str) -> String {
    format!("{}/{}", INTEGRATIONS_PATH, segment(id))
}

impl ApiClient {
    pub async fn create_integration(
        &self,
        ctx: &RequestContext,
        body: &IntegrationRequest,
    ) -> Result<IntegrationVO> {
        let op = format!("create integration {}", body.name);
        self.post_json(ctx, &op, INTEGRATIONS_PATH, body).await
    }

    pub async fn get_integration(&self, ctx: &RequestContext, id: &str) -> Result<IntegrationVO> {
        let op = format!("read integration {}", id);
        self.get_json(ctx, &op, &integration_path(id), &[]).await
    }

    pub async fn update_integration(
        &self,
        ctx: &RequestContext,
        id: &str,
        body: &IntegrationRequest,
    ) -> Result<()> {
        let op = format!("update integration {}", id);
        self.patch_unit(ctx, &op, &integration_path(id), Some(body)).await
    }

    pub async fn delete_integration(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        let op = format!("delete integration {}", id);
        self.delete_unit(ctx, &op, &integration_path(id), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_lists_config_keys_not_values() {
        let req = IntegrationRequest {
            name: "prom".into(),
            integration_type: "prometheus".into(),
            endpoint: "https://prom.example.com".into(),
            config: vec![KeyValue::new("password", "s3cr3t")],
        };
        let dbg = format!("{:?}", req);
        assert!(dbg.contains("password"));
        assert!(!dbg.contains("s3cr3t"));
        assert_eq!(serde_json::to_value(&req).unwrap()["type"], "prometheus");
    }
}
