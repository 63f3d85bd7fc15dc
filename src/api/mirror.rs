//! Mirror topics and mirror consumer groups under a kafka link.

use super::kafka_link::link_path;
use super::{segment, ApiClient, Page};
use crate::client::RequestContext;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorTopicRequest {
    pub source_topic_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorTopicStateUpdate {
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MirrorTopicVO {
    pub mirror_topic_id: String,
    pub mirror_topic_name: String,
    pub source_topic_name: String,
    pub source_topic_id: String,
    pub state: String,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorGroupRequest {
    pub source_group_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MirrorGroupVO {
    pub mirror_group_id: String,
    pub source_group_id: String,
    pub state: String,
    pub error_code: Option<String>,
}

fn mirror_topics_path(instance_id: &str, link_id: &str) -> String {
    format!("{}/kafka-link-mirror-topics", link_path(instance_id, link_id))
}

fn mirror_groups_path(instance_id: &str, link_id: &str) -> String {
    format!("{}/kafka-link-mirror-groups", link_path(instance_id, link_id))
}

impl ApiClient {
    pub async fn create_mirror_topic(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        link_id: &str,
        body: &MirrorTopicRequest,
    ) -> Result<()> {
        let op = format!(
            "create mirror topic {} on kafka link {}/{}",
            body.source_topic_name, instance_id, link_id
        );
        self.post_unit(ctx, &op, &mirror_topics_path(instance_id, link_id), body).await
    }

    pub async fn list_mirror_topics(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        link_id: &str,
    ) -> Result<Vec<MirrorTopicVO>> {
        let op = format!("list mirror topics of kafka link {}/{}", instance_id, link_id);
        let page: Page<MirrorTopicVO> =
            self.get_json(ctx, &op, &mirror_topics_path(instance_id, link_id), &[]).await?;
        Ok(page.list)
    }

    pub async fn update_mirror_topic_state(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        link_id: &str,
        mirror_topic_id: &str,
        state: &str,
    ) -> Result<()> {
        let op = format!(
            "set state of mirror topic {} on kafka link {}/{} to {}",
            mirror_topic_id, instance_id, link_id, state
        );
        let path =
            format!("{}/{}", mirror_topics_path(instance_id, link_id), segment(mirror_topic_id));
        let body = MirrorTopicStateUpdate { state: state.to_string() };
        self.patch_unit(ctx, &op, &path, Some(&body)).await
    }

    pub async fn delete_mirror_topic(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        link_id: &str,
        mirror_topic_id: &str,
    ) -> Result<()> {
        let op = format!(
            "delete mirror topic {} on kafka link {}/{}",
            mirror_topic_id, instance_id, link_id
        );
        let path =
            format!("{}/{}", mirror_topics_path(instance_id, link_id), segment(mirror_topic_id));
        self.delete_unit(ctx, &op, &path, &[]).await
    }

    pub async fn create_mirror_group(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        link_id: &str,
        body: &MirrorGroupRequest,
    ) -> Result<()> {
        let op = format!(
            "create mirror group {} on kafka link {}/{}",
            body.source_group_id, instance_id, link_id
        );
        self.post_unit(ctx, &op, &mirror_groups_path(instance_id, link_id), body).await
    }

    pub async fn list_mirror_groups(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        link_id: &str,
    ) -> Result<Vec<MirrorGroupVO>> {
        let op = format!("list mirror groups of kafka link {}/{}", instance_id, link_id);
        let page: Page<MirrorGroupVO> =
            self.get_json(ctx, &op, &mirror_groups_path(instance_id, link_id), &[]).await?;
        Ok(page.list)
    }

    pub async fn delete_mirror_group(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        link_id: &str,
        mirror_group_id: &str,
    ) -> Result<()> {
        let op = format!(
            "delete mirror group {} on kafka link {}/{}",
            mirror_group_id, instance_id, link_id
        );
        let path =
            format!("{}/{}", mirror_groups_path(instance_id, link_id), segment(mirror_group_id));
        self.delete_unit(ctx, &op, &path, &[]).await
    }
}
