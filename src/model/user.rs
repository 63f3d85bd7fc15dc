use super::Attr;
use crate::api::{UserRequest, UserVO};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// `kafka_user` state. The password is write-only.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserState {
    pub environment_id: Attr<String>,
    pub kafka_instance_id: Attr<String>,
    pub username: Attr<String>,
    pub password: Attr<String>,
}

impl std::fmt::Debug for UserState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserState")
            .field("environment_id", &self.environment_id)
            .field("kafka_instance_id", &self.kafka_instance_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

pub fn expand(plan: &UserState) -> Result<UserRequest> {
    let name = plan
        .username
        .non_empty()
        .ok_or_else(|| Error::validation("kafka user: username is required"))?;
    let password = plan
        .password
        .non_empty()
        .ok_or_else(|| Error::validation(format!("kafka user {}: password is required", name)))?;
    Ok(UserRequest { name: name.to_string(), password: password.to_string() })
}

pub fn flatten(vo: &UserVO, prior: &UserState) -> UserState {
    UserState {
        environment_id: prior.environment_id.clone().or_prior(&Attr::Null),
        kafka_instance_id: prior.kafka_instance_id.clone().or_prior(&Attr::Null),
        username: Attr::Known(vo.name.clone()),
        password: prior.password.clone().or_prior(&Attr::Null),
    }
}
