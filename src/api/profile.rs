use super::{segment, ApiClient, Page};
use crate::client::RequestContext;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployProfileVO {
    pub name: String,
    pub provider: String,
    pub region: String,
    pub vpc: Option<String>,
    pub available: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BucketProfileVO {
    pub id: String,
    pub bucket_name: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

fn profile_path(name: &str) -> String {
    format!("/api/v1/profiles/{}", segment(name))
}

impl ApiClient {
    pub async fn get_deploy_profile(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<DeployProfileVO> {
        let op = format!("read deploy profile {}", name);
        self.get_json(ctx, &op, &profile_path(name), &[]).await
    }

    pub async fn list_bucket_profiles(
        &self,
        ctx: &RequestContext,
        profile: &str,
    ) -> Result<Vec<BucketProfileVO>> {
        let op = format!("list bucket profiles of deploy profile {}", profile);
        let page: Page<BucketProfileVO> = self
            .get_json(ctx, &op, &format!("{}/bucket-profiles", profile_path(profile)), &[])
            .await?;
        Ok(page.list)
    }
}
