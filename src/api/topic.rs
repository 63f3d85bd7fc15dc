use super::{segment, ApiClient, KeyValue};
use crate::client::RequestContext;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCreateRequest {
    pub name: String,
    pub partition: i64,
    pub compact_strategy: String,
    #[serde(default)]
    pub configs: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPartitionUpdate {
    pub partition: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfigUpdate {
    pub configs: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicVO {
    pub topic_id: String,
    pub name: String,
    pub partition: i64,
    pub compact_strategy: String,
    pub configs: Vec<KeyValue>,
}

fn topics_path(instance_id: &str) -> String {
    format!("/api/v1/instances/{}/topics", segment(instance_id))
}

fn topic_path(instance_id: &str, topic_id: &str) -> String {
    format!("{}/{}", topics_path(instance_id), segment(topic_id))
}

impl ApiClient {
    pub async fn create_topic(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        body: &TopicCreateRequest,
    ) -> Result<TopicVO> {
        let op = format!("create kafka topic {} on instance {}", body.name, instance_id);
        self.post_json(ctx, &op, &topics_path(instance_id), body).await
    }

    pub async fn get_topic(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        topic_id: &str,
    ) -> Result<TopicVO> {
        let op = format!("read kafka topic {}/{}", instance_id, topic_id);
        self.get_json(ctx, &op, &topic_path(instance_id, topic_id), &[]).await
    }

    pub async fn update_topic_partition(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        topic_id: &str,
        partition: i64,
    ) -> Result<()> {
        let op = format!("update partition count of kafka topic {}/{}", instance_id, topic_id);
        let path = format!("{}/partition-counts", topic_path(instance_id, topic_id));
        self.patch_unit(ctx, &op, &path, Some(&TopicPartitionUpdate { partition })).await
    }

    pub async fn update_topic_configs(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        topic_id: &str,
        body: &TopicConfigUpdate,
    ) -> Result<()> {
        let op = format!("update configurations of kafka topic {}/{}", instance_id, topic_id);
        let path = format!("{}/configurations", topic_path(instance_id, topic_id));
        self.patch_unit(ctx, &op, &path, Some(body)).await
    }

    pub async fn delete_topic(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        topic_id: &str,
    ) -> Result<()> {
        let op = format!("delete kafka topic {}/{}", instance_id, topic_id);
        self.delete_unit(ctx, &op, &topic_path(instance_id, topic_id), &[]).await
    }
}
