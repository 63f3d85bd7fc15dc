//! Typed control-plane endpoints.
//!
//! Each submodule owns the wire types (camelCase JSON) and the [`ApiClient`] methods
//! for one resource family. Methods label their failures with the operation and the
//! resource id, e.g. `read kafka topic kf-1/t-1: HTTP 500: ...`.

pub mod acl;
pub mod instance;
pub mod integration;
pub mod kafka_link;
pub mod mirror;
pub mod profile;
pub mod topic;
pub mod user;

use crate::client::{HttpClient, RequestContext};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use acl::{AccessControl, AclBinding, AclFilter, ResourcePattern};
pub use instance::{
    EndpointVO, InstanceBasicUpdate, InstanceConfigUpdate, InstanceCreateRequest,
    InstanceIntegrationBinding, InstanceSpecRequest, InstanceSpecUpdate, InstanceVO, NetworkVO,
};
pub use integration::{IntegrationRequest, IntegrationVO};
pub use kafka_link::{KafkaLinkRequest, KafkaLinkVO, SourceClusterVO};
pub use mirror::{MirrorGroupRequest, MirrorGroupVO, MirrorTopicRequest, MirrorTopicStateUpdate, MirrorTopicVO};
pub use profile::{BucketProfileVO, DeployProfileVO};
pub use topic::{TopicConfigUpdate, TopicCreateRequest, TopicPartitionUpdate, TopicVO};
pub use user::{UserRequest, UserVO};

/// `{key, value}` pair used for every config list on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Paginated list envelope. Only `list` is used by the controllers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub page_num: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub total_page: Option<u32>,
}

/// Typed facade over [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
}

impl ApiClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let bytes = self.http.get(ctx, path, query).await.map_err(|e| e.relabel(operation))?;
        decode(operation, &bytes)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        operation: &str,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let bytes = self.http.post(ctx, path, body).await.map_err(|e| e.relabel(operation))?;
        decode(operation, &bytes)
    }

    async fn post_unit<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        operation: &str,
        path: &str,
        body: &B,
    ) -> Result<()> {
        self.http.post(ctx, path, body).await.map_err(|e| e.relabel(operation))?;
        Ok(())
    }

    async fn patch_unit<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        operation: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        self.http.patch(ctx, path, body).await.map_err(|e| e.relabel(operation))?;
        Ok(())
    }

    async fn put_unit<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        operation: &str,
        path: &str,
        body: &B,
    ) -> Result<()> {
        self.http.put(ctx, path, body).await.map_err(|e| e.relabel(operation))?;
        Ok(())
    }

    async fn delete_unit(
        &self,
        ctx: &RequestContext,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<()> {
        self.http.delete(ctx, path, query).await.map_err(|e| e.relabel(operation))?;
        Ok(())
    }
}

/// Decode a 2xx body.
pub(crate) fn decode<T: DeserializeOwned>(operation: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|source| Error::Decode { operation: operation.to_string(), source })
}

/// Percent-encode one path segment supplied by the user (topic names, user names...).
pub(crate) fn segment(value: &str) -> String {
    crate::signer::escape_query(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_reads_list_and_tolerates_missing_counters() {
        let page: Page<KeyValue> =
            serde_json::from_str(r#"{"list":[{"key":"a","value":"1"}],"pageNum":1}"#).unwrap();
        assert_eq!(page.list, vec![KeyValue::new("a", "1")]);
        assert_eq!(page.page_num, Some(1));
        assert_eq!(page.total, None);

        let empty: Page<KeyValue> = serde_json::from_str("{}").unwrap();
        assert!(empty.list.is_empty());
    }

    #[test]
    fn decode_names_operation() {
        let err = decode::<Page<KeyValue>>("list things", b"not json").unwrap_err();
        assert!(err.to_string().starts_with("list things"));
    }

    #[test]
    fn segments_are_escaped() {
        assert_eq!(segment("orders"), "orders");
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
    }
}
