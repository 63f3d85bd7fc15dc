use super::{segment, ApiClient};
use crate::client::RequestContext;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source cluster descriptor. The server never echoes `password`, `keystoreKey`
/// or `keystoreCertificateChain`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceClusterVO {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sasl_mechanism: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truststore_certificates: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keystore_certificate_chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keystore_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_endpoint_identification: Option<bool>,
}

impl std::fmt::Debug for SourceClusterVO {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceClusterVO")
            .field("endpoint", &self.endpoint)
            .field("security_protocol", &self.security_protocol)
            .field("sasl_mechanism", &self.sasl_mechanism)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KafkaLinkRequest {
    pub link_id: String,
    pub start_offset_time: String,
    pub source_cluster: SourceClusterVO,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KafkaLinkVO {
    pub link_id: String,
    pub instance_id: String,
    pub start_offset_time: String,
    pub source_cluster: SourceClusterVO,
    pub status: String,
    pub error_message: Option<String>,
    pub gmt_create: Option<DateTime<Utc>>,
    pub gmt_modified: Option<DateTime<Utc>>,
}

pub(crate) fn links_path(instance_id: &str) -> String {
    format!("/api/v1/instances/{}/kafka-links", segment(instance_id))
}

pub(crate) fn link_path(instance_id: &str, link_id: &str) -> String {
    format!("{}/{}", links_path(instance_id), segment(link_id))
}

impl ApiClient {
    pub async fn create_kafka_link(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        body: &KafkaLinkRequest,
    ) -> Result<KafkaLinkVO> {
        let op = format!("create kafka link {} on instance {}", body.link_id, instance_id);
        self.post_json(ctx, &op, &links_path(instance_id), body).await
    }

    pub async fn get_kafka_link(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        link_id: &str,
    ) -> Result<KafkaLinkVO> {
        let op = format!("read kafka link {}/{}", instance_id, link_id);
        self.get_json(ctx, &op, &link_path(instance_id, link_id), &[]).await
    }

    pub async fn delete_kafka_link(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        link_id: &str,
    ) -> Result<()> {
        let op = format!("delete kafka link {}/{}", instance_id, link_id);
        self.delete_unit(ctx, &op, &link_path(instance_id, link_id), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_secrets_are_not_serialized() {
        let req = KafkaLinkRequest {
            link_id: "link-1".into(),
            start_offset_time: "latest".into(),
            source_cluster: SourceClusterVO {
                endpoint: "src:9092".into(),
                ..Default::default()
            },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["linkId"], "link-1");
        assert_eq!(v["sourceCluster"], serde_json::json!({"endpoint": "src:9092"}));
    }

    #[test]
    fn debug_hides_secrets() {
        let sc = SourceClusterVO {
            endpoint: "src:9092".into(),
            password: Some("secret".into()),
            keystore_key: Some("-----BEGIN".into()),
            ..Default::default()
        };
        let dbg = format!("{:?}", sc);
        assert!(!dbg.contains("secret"));
        assert!(!dbg.contains("BEGIN"));
    }
}
