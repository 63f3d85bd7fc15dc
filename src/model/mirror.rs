use super::common::non_empty;
use super::Attr;
use crate::api::{MirrorGroupRequest, MirrorGroupVO, MirrorTopicRequest, MirrorTopicVO};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const LINKING: &str = "LINKING";
pub const PAUSED: &str = "PAUSED";
pub const PROMOTED: &str = "PROMOTED";

const TOPIC_STATES: &[&str] = &[LINKING, PAUSED, PROMOTED];

/// `kafka_link_mirror_topic` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorTopicState {
    pub environment_id: Attr<String>,
    pub kafka_instance_id: Attr<String>,
    pub kafka_link_id: Attr<String>,
    pub source_topic_name: Attr<String>,
    pub source_topic_id: Attr<String>,
    pub mirror_topic_id: Attr<String>,
    pub mirror_topic_name: Attr<String>,
    pub state: Attr<String>,
    pub error_code: Attr<String>,
}

/// `kafka_link_mirror_group` state. Immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorGroupState {
    pub environment_id: Attr<String>,
    pub kafka_instance_id: Attr<String>,
    pub kafka_link_id: Attr<String>,
    pub source_group_id: Attr<String>,
    pub mirror_group_id: Attr<String>,
    pub state: Attr<String>,
    pub error_code: Attr<String>,
}

/// Desired mirror topic state, if one is set.
pub fn desired_topic_state(plan: &MirrorTopicState) -> Result<Option<&str>> {
    match plan.state.non_empty() {
        None => Ok(None),
        Some(s) if TOPIC_STATES.contains(&s) => Ok(Some(s)),
        Some(s) => Err(Error::validation(format!(
            "mirror topic: state must be one of {}, got {:?}",
            TOPIC_STATES.join("|"),
            s
        ))),
    }
}

pub fn expand_topic(plan: &MirrorTopicState) -> Result<MirrorTopicRequest> {
    desired_topic_state(plan)?;
    let source = plan
        .source_topic_name
        .non_empty()
        .ok_or_else(|| Error::validation("mirror topic: source_topic_name is required"))?;
    Ok(MirrorTopicRequest { source_topic_name: source.to_string() })
}

pub fn flatten_topic(vo: &MirrorTopicVO, prior: &MirrorTopicState) -> MirrorTopicState {
    MirrorTopicState {
        environment_id: prior.environment_id.clone().or_prior(&Attr::Null),
        kafka_instance_id: prior.kafka_instance_id.clone().or_prior(&Attr::Null),
        kafka_link_id: prior.kafka_link_id.clone().or_prior(&Attr::Null),
        source_topic_name: Attr::Known(vo.source_topic_name.clone()),
        source_topic_id: non_empty(&vo.source_topic_id),
        mirror_topic_id: non_empty(&vo.mirror_topic_id),
        mirror_topic_name: non_empty(&vo.mirror_topic_name),
        state: non_empty(&vo.state),
        error_code: vo.error_code.as_deref().map(non_empty).unwrap_or_default(),
    }
}

pub fn expand_group(plan: &MirrorGroupState) -> Result<MirrorGroupRequest> {
    let source = plan
        .source_group_id
        .non_empty()
        .ok_or_else(|| Error::validation("mirror group: source_group_id is required"))?;
    Ok(MirrorGroupRequest { source_group_id: source.to_string() })
}

pub fn flatten_group(vo: &MirrorGroupVO, prior: &MirrorGroupState) -> MirrorGroupState {
    MirrorGroupState {
        environment_id: prior.environment_id.clone().or_prior(&Attr::Null),
        kafka_instance_id: prior.kafka_instance_id.clone().or_prior(&Attr::Null),
        kafka_link_id: prior.kafka_link_id.clone().or_prior(&Attr::Null),
        source_group_id: Attr::Known(vo.source_group_id.clone()),
        mirror_group_id: non_empty(&vo.mirror_group_id),
        state: non_empty(&vo.state),
        error_code: vo.error_code.as_deref().map(non_empty).unwrap_or_default(),
    }
}
