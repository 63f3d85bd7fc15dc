use super::common::{configs_to_wire, managed_configs, ConfigMap};
use super::Attr;
use crate::api::{TopicConfigUpdate, TopicCreateRequest, TopicVO};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const CLEANUP_POLICY: &str = "cleanup.policy";
pub const COMPACT: &str = "COMPACT";
pub const DELETE: &str = "DELETE";

/// `kafka_topic` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicState {
    pub environment_id: Attr<String>,
    pub kafka_instance_id: Attr<String>,
    pub topic_id: Attr<String>,
    pub name: Attr<String>,
    pub partition: Attr<i64>,
    pub compact_strategy: Attr<String>,
    pub configs: Attr<ConfigMap>,
}

impl TopicState {
    pub fn config_map(&self) -> ConfigMap {
        self.configs.value_or(ConfigMap::new())
    }
}

/// `cleanup.policy` containing `compact` selects compaction.
pub fn compact_strategy(configs: &ConfigMap) -> &'static str {
    match configs.get(CLEANUP_POLICY) {
        Some(policy) if policy.contains("compact") => COMPACT,
        _ => DELETE,
    }
}

pub fn expand_create(plan: &TopicState) -> Result<TopicCreateRequest> {
    let name = plan
        .name
        .non_empty()
        .ok_or_else(|| Error::validation("kafka topic: name is required"))?;
    let partition = match plan.partition.value() {
        Some(p) if *p > 0 => *p,
        Some(p) => {
            return Err(Error::validation(format!(
                "kafka topic {}: partition must be positive, got {}",
                name, p
            )))
        }
        None => return Err(Error::validation(format!("kafka topic {}: partition is required", name))),
    };
    let configs = plan.config_map();
    Ok(TopicCreateRequest {
        name: name.to_string(),
        partition,
        compact_strategy: compact_strategy(&configs).to_string(),
        configs: configs_to_wire(&configs),
    })
}

pub fn expand_configs(plan: &TopicState) -> TopicConfigUpdate {
    TopicConfigUpdate { configs: configs_to_wire(&plan.config_map()) }
}

pub fn flatten(vo: &TopicVO, prior: &TopicState) -> TopicState {
    TopicState {
        environment_id: prior.environment_id.clone().or_prior(&Attr::Null),
        kafka_instance_id: prior.kafka_instance_id.clone().or_prior(&Attr::Null),
        topic_id: Attr::Known(vo.topic_id.clone()),
        name: Attr::Known(vo.name.clone()),
        partition: Attr::Known(vo.partition),
        compact_strategy: if vo.compact_strategy.is_empty() {
            Attr::Null
        } else {
            Attr::Known(vo.compact_strategy.clone())
        },
        configs: managed_configs(&vo.configs, &prior.configs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::KeyValue;

    fn configs(pairs: &[(&str, &str)]) -> ConfigMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn cleanup_policy_selects_strategy() {
        assert_eq!(compact_strategy(&configs(&[("cleanup.policy", "compact")])), COMPACT);
        assert_eq!(compact_strategy(&configs(&[("cleanup.policy", "delete,compact")])), COMPACT);
        assert_eq!(compact_strategy(&configs(&[("cleanup.policy", "delete")])), DELETE);
        assert_eq!(compact_strategy(&ConfigMap::new()), DELETE);
    }

    #[test]
    fn expand_requires_positive_partition() {
        let plan = TopicState { name: "orders".into(), partition: Attr::Known(0), ..Default::default() };
        assert!(expand_create(&plan).unwrap_err().is_validation());
        let plan = TopicState { name: "orders".into(), partition: Attr::Known(3), ..Default::default() };
        let req = expand_create(&plan).unwrap();
        assert_eq!(req.partition, 3);
        assert_eq!(req.compact_strategy, DELETE);
    }

    #[test]
    fn flatten_keeps_parent_ids_and_managed_keys() {
        let prior = TopicState {
            environment_id: "env-1".into(),
            kafka_instance_id: "kf-1".into(),
            configs: Attr::Known(configs(&[("retention.ms", "1")])),
            ..Default::default()
        };
        let vo = TopicVO {
            topic_id: "t-1".into(),
            name: "orders".into(),
            partition: 3,
            compact_strategy: "DELETE".into(),
            configs: vec![KeyValue::new("retention.ms", "2"), KeyValue::new("segment.ms", "9")],
        };
        let state = flatten(&vo, &prior);
        assert_eq!(state.kafka_instance_id, Attr::from("kf-1"));
        assert_eq!(state.topic_id, Attr::from("t-1"));
        assert_eq!(state.config_map(), configs(&[("retention.ms", "2")]));
    }
}
