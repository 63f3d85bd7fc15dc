//! Read-only lookups: deploy profiles, their bucket profiles, and existing instances.

use crate::api::{BucketProfileVO, DeployProfileVO};
use crate::client::RequestContext;
use crate::controller::{Backend, Controller, InstanceController};
use crate::error::{Error, Result};
use crate::model::{Attr, InstanceState};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A deploy profile: where instances created with it are placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployProfile {
    pub name: String,
    pub cloud_provider: String,
    pub region: String,
    pub vpc: Option<String>,
    pub available: bool,
}

impl From<DeployProfileVO> for DeployProfile {
    fn from(vo: DeployProfileVO) -> Self {
        Self {
            name: vo.name,
            cloud_provider: vo.provider,
            region: vo.region,
            vpc: vo.vpc,
            available: vo.available,
        }
    }
}

/// A storage bucket attached to a deploy profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketProfile {
    pub id: String,
    pub bucket_name: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

impl From<BucketProfileVO> for BucketProfile {
    fn from(vo: BucketProfileVO) -> Self {
        Self { id: vo.id, bucket_name: vo.bucket_name, region: vo.region, endpoint: vo.endpoint }
    }
}

/// Bucket profiles of one deploy profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketProfiles {
    pub profile_name: String,
    pub bucket_profiles: Vec<BucketProfile>,
}

#[derive(Debug, Clone)]
pub struct DataSources {
    backend: Backend,
    instances: InstanceController,
}

impl DataSources {
    pub fn new(backend: Backend) -> Self {
        let instances = InstanceController::new(backend.clone());
        Self { backend, instances }
    }

    #[instrument(skip_all, fields(profile = name))]
    pub async fn deploy_profile(&self, ctx: &RequestContext, name: &str) -> Result<DeployProfile> {
        if name.trim().is_empty() {
            return Err(Error::validation("deploy profile name must not be empty"));
        }
        let vo = self.backend.api.get_deploy_profile(ctx, name).await?;
        Ok(vo.into())
    }

    #[instrument(skip_all, fields(profile = profile))]
    pub async fn bucket_profiles(&self, ctx: &RequestContext, profile: &str) -> Result<BucketProfiles> {
        if profile.trim().is_empty() {
            return Err(Error::validation("deploy profile name must not be empty"));
        }
        let list = self.backend.api.list_bucket_profiles(ctx, profile).await?;
        Ok(BucketProfiles {
            profile_name: profile.to_string(),
            bucket_profiles: list.into_iter().map(BucketProfile::from).collect(),
        })
    }

    /// An existing instance with every server-side config key and its endpoints.
    #[instrument(skip_all, fields(instance = id))]
    pub async fn instance(
        &self,
        ctx: &RequestContext,
        environment_id: &str,
        id: &str,
    ) -> Result<InstanceState> {
        if id.trim().is_empty() {
            return Err(Error::validation("kafka instance id must not be empty"));
        }
        let environment_id = match environment_id.trim() {
            "" => Attr::Null,
            env => Attr::Known(env.to_string()),
        };
        let prior = InstanceState {
            environment_id,
            id: Attr::Known(id.to_string()),
            configs: Attr::Unknown,
            ..Default::default()
        };
        self.instances
            .read(ctx, &prior)
            .await?
            .ok_or_else(|| Error::not_found(format!("kafka instance {}", id)))
    }
}
