use super::common::{format_time, non_empty};
use super::Attr;
use crate::api::{IntegrationRequest, IntegrationVO, KeyValue};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationType {
    Kafka,
    Prometheus,
    #[serde(rename = "cloudwatch")]
    CloudWatch,
}

impl IntegrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::Kafka => "kafka",
            IntegrationType::Prometheus => "prometheus",
            IntegrationType::CloudWatch => "cloudwatch",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "kafka" => Ok(IntegrationType::Kafka),
            "prometheus" => Ok(IntegrationType::Prometheus),
            "cloudwatch" => Ok(IntegrationType::CloudWatch),
            other => Err(Error::validation(format!(
                "integration: type must be one of kafka|prometheus|cloudwatch, got {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaIntegrationConfig {
    pub security_protocol: Attr<String>,
    pub sasl_mechanism: Attr<String>,
    pub sasl_username: Attr<String>,
    pub sasl_password: Attr<String>,
}

impl fmt::Debug for KafkaIntegrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaIntegrationConfig")
            .field("security_protocol", &self.security_protocol)
            .field("sasl_mechanism", &self.sasl_mechanism)
            .field("sasl_username", &self.sasl_username)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    pub username: Attr<String>,
    pub password: Attr<String>,
    pub bearer_token: Attr<String>,
}

impl fmt::Debug for PrometheusConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusConfig").field("username", &self.username).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudWatchConfig {
    pub namespace: Attr<String>,
}

/// `integration` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationState {
    pub environment_id: Attr<String>,
    pub id: Attr<String>,
    pub name: Attr<String>,
    #[serde(rename = "type")]
    pub integration_type: Attr<String>,
    pub endpoint: Attr<String>,
    pub kafka_config: Attr<KafkaIntegrationConfig>,
    pub prometheus_config: Attr<PrometheusConfig>,
    pub cloudwatch_config: Attr<CloudWatchConfig>,
    pub created_at: Attr<String>,
    pub last_updated: Attr<String>,
}

const SECURITY_PROTOCOL: &str = "security_protocol";
const SASL_MECHANISM: &str = "sasl_mechanism";
const SASL_USERNAME: &str = "sasl_username";
const SASL_PASSWORD: &str = "sasl_password";
const USERNAME: &str = "username";
const PASSWORD: &str = "password";
const BEARER_TOKEN: &str = "bearer_token";
const NAMESPACE: &str = "namespace";

fn push(config: &mut Vec<KeyValue>, key: &str, value: &Attr<String>) {
    if let Some(v) = value.value() {
        config.push(KeyValue::new(key, v.clone()));
    }
}

fn lookup(config: &[KeyValue], key: &str) -> Attr<String> {
    config.iter().find(|kv| kv.key == key).map(|kv| non_empty(&kv.value)).unwrap_or_default()
}

fn unexpected_block(kind: IntegrationType, block: &str) -> Error {
    Error::validation(format!("integration: {} is not allowed for type {}", block, kind))
}

pub fn integration_type(plan: &IntegrationState) -> Result<IntegrationType> {
    let raw = plan
        .integration_type
        .non_empty()
        .ok_or_else(|| Error::validation("integration: type is required"))?;
    IntegrationType::parse(raw)
}

/// Create/update body. The type decides which config block is required.
pub fn expand(plan: &IntegrationState) -> Result<IntegrationRequest> {
    let kind = integration_type(plan)?;
    let name = plan
        .name
        .non_empty()
        .ok_or_else(|| Error::validation("integration: name is required"))?;

    let mut config = Vec::new();
    match kind {
        IntegrationType::Kafka => {
            if plan.prometheus_config.is_known() {
                return Err(unexpected_block(kind, "prometheus_config"));
            }
            if plan.cloudwatch_config.is_known() {
                return Err(unexpected_block(kind, "cloudwatch_config"));
            }
            let kafka = plan.kafka_config.value().ok_or_else(|| {
                Error::validation("integration: kafka_config is required for type kafka")
            })?;
            push(&mut config, SECURITY_PROTOCOL, &kafka.security_protocol);
            push(&mut config, SASL_MECHANISM, &kafka.sasl_mechanism);
            push(&mut config, SASL_USERNAME, &kafka.sasl_username);
            push(&mut config, SASL_PASSWORD, &kafka.sasl_password);
        }
        IntegrationType::Prometheus => {
            if plan.kafka_config.is_known() {
                return Err(unexpected_block(kind, "kafka_config"));
            }
            if plan.cloudwatch_config.is_known() {
                return Err(unexpected_block(kind, "cloudwatch_config"));
            }
            if let Some(prom) = plan.prometheus_config.value() {
                push(&mut config, USERNAME, &prom.username);
                push(&mut config, PASSWORD, &prom.password);
                push(&mut config, BEARER_TOKEN, &prom.bearer_token);
            }
        }
        IntegrationType::CloudWatch => {
            if plan.kafka_config.is_known() {
                return Err(unexpected_block(kind, "kafka_config"));
            }
            if plan.prometheus_config.is_known() {
                return Err(unexpected_block(kind, "prometheus_config"));
            }
            let cw = plan.cloudwatch_config.value().ok_or_else(|| {
                Error::validation("integration: cloudwatch_config is required for type cloudwatch")
            })?;
            push(&mut config, NAMESPACE, &cw.namespace);
        }
    }

    let endpoint = match (kind, plan.endpoint.non_empty()) {
        (_, Some(e)) => e.to_string(),
        (IntegrationType::CloudWatch, None) => String::new(),
        (_, None) => {
            return Err(Error::validation(format!("integration: endpoint is required for type {}", kind)))
        }
    };

    Ok(IntegrationRequest {
        name: name.to_string(),
        integration_type: kind.as_str().to_string(),
        endpoint,
        config,
    })
}

/// Passwords and bearer tokens are never returned; they come from `prior`.
pub fn flatten(vo: &IntegrationVO, prior: &IntegrationState) -> IntegrationState {
    let kind = IntegrationType::parse(&vo.integration_type).ok();
    let cfg = &vo.config;

    let mut state = IntegrationState {
        environment_id: prior.environment_id.clone().or_prior(&Attr::Null),
        id: Attr::Known(vo.id.clone()),
        name: Attr::Known(vo.name.clone()),
        integration_type: Attr::Known(
            kind.map(|k| k.as_str().to_string()).unwrap_or_else(|| vo.integration_type.clone()),
        ),
        endpoint: non_empty(&vo.endpoint),
        created_at: format_time(&vo.gmt_create),
        last_updated: format_time(&vo.gmt_modified),
        ..Default::default()
    };

    match kind {
        Some(IntegrationType::Kafka) => {
            let prior_kafka = prior.kafka_config.value().cloned().unwrap_or_default();
            state.kafka_config = Attr::Known(KafkaIntegrationConfig {
                security_protocol: lookup(cfg, SECURITY_PROTOCOL),
                sasl_mechanism: lookup(cfg, SASL_MECHANISM),
                sasl_username: lookup(cfg, SASL_USERNAME),
                sasl_password: lookup(cfg, SASL_PASSWORD).or_prior(&prior_kafka.sasl_password),
            });
        }
        Some(IntegrationType::Prometheus) => {
            let prior_prom = prior.prometheus_config.value().cloned();
            let prom = PrometheusConfig {
                username: lookup(cfg, USERNAME),
                password: lookup(cfg, PASSWORD).or_prior(
                    &prior_prom.as_ref().map(|p| p.password.clone()).unwrap_or_default(),
                ),
                bearer_token: lookup(cfg, BEARER_TOKEN).or_prior(
                    &prior_prom.as_ref().map(|p| p.bearer_token.clone()).unwrap_or_default(),
                ),
            };
            if prom != PrometheusConfig::default() || prior_prom.is_some() {
                state.prometheus_config = Attr::Known(prom);
            }
        }
        Some(IntegrationType::CloudWatch) => {
            state.cloudwatch_config =
                Attr::Known(CloudWatchConfig { namespace: lookup(cfg, NAMESPACE) });
        }
        None => {}
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kafka_plan() -> IntegrationState {
        IntegrationState {
            name: "sink".into(),
            integration_type: "kafka".into(),
            endpoint: "broker:9092".into(),
            kafka_config: Attr::Known(KafkaIntegrationConfig {
                security_protocol: "SASL_PLAINTEXT".into(),
                sasl_mechanism: "PLAIN".into(),
                sasl_username: "svc".into(),
                sasl_password: "pw".into(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn kafka_requires_its_block() {
        let mut plan = kafka_plan();
        plan.kafka_config = Attr::Null;
        assert!(expand(&plan).unwrap_err().is_validation());

        let mut plan = kafka_plan();
        plan.cloudwatch_config = Attr::Known(CloudWatchConfig::default());
        assert!(expand(&plan).is_err());
    }

    #[test]
    fn configs_flatten_to_key_value_list() {
        let req = expand(&kafka_plan()).unwrap();
        assert_eq!(req.integration_type, "kafka");
        assert!(req.config.contains(&KeyValue::new("sasl_password", "pw")));
        assert_eq!(req.config.len(), 4);
    }

    #[test]
    fn secrets_are_carried_forward() {
        let vo = IntegrationVO {
            id: "int-1".into(),
            name: "sink".into(),
            integration_type: "kafka".into(),
            endpoint: "broker:9092".into(),
            config: vec![
                KeyValue::new("security_protocol", "SASL_PLAINTEXT"),
                KeyValue::new("sasl_mechanism", "PLAIN"),
                KeyValue::new("sasl_username", "svc"),
            ],
            ..Default::default()
        };
        let state = flatten(&vo, &kafka_plan());
        let kafka = state.kafka_config.value().unwrap();
        assert_eq!(kafka.sasl_password, Attr::from("pw"));
        assert_eq!(kafka.sasl_username, Attr::from("svc"));

        let prom_prior = IntegrationState {
            prometheus_config: Attr::Known(PrometheusConfig {
                username: "u".into(),
                password: "p".into(),
                bearer_token: "tok".into(),
            }),
            ..Default::default()
        };
        let vo = IntegrationVO {
            id: "int-2".into(),
            integration_type: "prometheus".into(),
            config: vec![KeyValue::new("username", "u")],
            ..Default::default()
        };
        let prom = flatten(&vo, &prom_prior).prometheus_config.into_value().unwrap();
        assert_eq!(prom.password, Attr::from("p"));
        assert_eq!(prom.bearer_token, Attr::from("tok"));
    }

    #[test]
    fn type_parsing() {
        assert_eq!(IntegrationType::parse("CloudWatch").unwrap(), IntegrationType::CloudWatch);
        assert!(IntegrationType::parse("datadog").is_err());
    }
}
