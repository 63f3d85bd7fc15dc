use super::{segment, ApiClient, Page};
use crate::client::RequestContext;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequest {
    pub name: String,
    pub password: String,
}

impl std::fmt::Debug for UserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRequest").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Users come back without their password.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserVO {
    pub name: String,
}

fn users_path(instance_id: &str) -> String {
    format!("/api/v1/instances/{}/users", segment(instance_id))
}

impl ApiClient {
    pub async fn create_user(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        body: &UserRequest,
    ) -> Result<UserVO> {
        let op = format!("create kafka user {} on instance {}", body.name, instance_id);
        self.post_json(ctx, &op, &users_path(instance_id), body).await
    }

    /// Filtered list lookup; an empty result is `NotFound`.
    pub async fn get_user(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        name: &str,
    ) -> Result<UserVO> {
        let op = format!("read kafka user {}/{}", instance_id, name);
        let page: Page<UserVO> = self
            .get_json(ctx, &op, &users_path(instance_id), &[("userNames", name.to_string())])
            .await?;
        page.list
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("kafka user {}/{}", instance_id, name)))
    }

    pub async fn delete_user(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        name: &str,
    ) -> Result<()> {
        let op = format!("delete kafka user {}/{}", instance_id, name);
        let path = format!("{}/{}", users_path(instance_id), segment(name));
        self.delete_unit(ctx, &op, &path, &[]).await
    }
}
