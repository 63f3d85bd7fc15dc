use super::common::{format_time, non_empty};
use super::Attr;
use crate::api::{KafkaLinkRequest, KafkaLinkVO, SourceClusterVO};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where mirroring starts in the source topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffsetTime {
    Latest,
    Earliest,
    /// Unix timestamp in milliseconds.
    Timestamp(i64),
}

impl StartOffsetTime {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "latest" => Ok(StartOffsetTime::Latest),
            "earliest" => Ok(StartOffsetTime::Earliest),
            other => other.parse::<i64>().ok().filter(|ms| *ms >= 0).map(StartOffsetTime::Timestamp).ok_or_else(
                || {
                    Error::validation(format!(
                        "kafka link: start_offset_time must be latest, earliest or a millisecond timestamp, got {:?}",
                        other
                    ))
                },
            ),
        }
    }
}

impl fmt::Display for StartOffsetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartOffsetTime::Latest => f.write_str("latest"),
            StartOffsetTime::Earliest => f.write_str("earliest"),
            StartOffsetTime::Timestamp(ms) => write!(f, "{}", ms),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceCluster {
    pub endpoint: Attr<String>,
    pub security_protocol: Attr<String>,
    pub sasl_mechanism: Attr<String>,
    pub user: Attr<String>,
    pub password: Attr<String>,
    pub truststore_certificates: Attr<String>,
    pub keystore_certificate_chain: Attr<String>,
    pub keystore_key: Attr<String>,
    pub disable_endpoint_identification: Attr<bool>,
}

impl fmt::Debug for SourceCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceCluster")
            .field("endpoint", &self.endpoint)
            .field("security_protocol", &self.security_protocol)
            .field("sasl_mechanism", &self.sasl_mechanism)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// `kafka_link` state. Immutable once created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaLinkState {
    pub environment_id: Attr<String>,
    pub kafka_instance_id: Attr<String>,
    pub link_id: Attr<String>,
    pub start_offset_time: Attr<String>,
    pub source_cluster: Attr<SourceCluster>,
    pub status: Attr<String>,
    pub error_message: Attr<String>,
    pub created_at: Attr<String>,
    pub last_updated: Attr<String>,
}

fn opt(value: &Attr<String>) -> Option<String> {
    value.non_empty().map(str::to_string)
}

pub fn expand(plan: &KafkaLinkState) -> Result<KafkaLinkRequest> {
    let link_id = plan
        .link_id
        .non_empty()
        .ok_or_else(|| Error::validation("kafka link: link_id is required"))?;
    let start = match plan.start_offset_time.non_empty() {
        Some(raw) => StartOffsetTime::parse(raw)?,
        None => StartOffsetTime::Latest,
    };
    let source = plan
        .source_cluster
        .value()
        .ok_or_else(|| Error::validation("kafka link: source_cluster is required"))?;
    let endpoint = source
        .endpoint
        .non_empty()
        .ok_or_else(|| Error::validation("kafka link: source_cluster.endpoint is required"))?;

    Ok(KafkaLinkRequest {
        link_id: link_id.to_string(),
        start_offset_time: start.to_string(),
        source_cluster: SourceClusterVO {
            endpoint: endpoint.to_string(),
            security_protocol: opt(&source.security_protocol),
            sasl_mechanism: opt(&source.sasl_mechanism),
            user: opt(&source.user),
            password: opt(&source.password),
            truststore_certificates: opt(&source.truststore_certificates),
            keystore_certificate_chain: opt(&source.keystore_certificate_chain),
            keystore_key: opt(&source.keystore_key),
            disable_endpoint_identification: source.disable_endpoint_identification.value().copied(),
        },
    })
}

/// Secrets and certificates the server omits are carried forward from `prior`.
pub fn flatten(vo: &KafkaLinkVO, prior: &KafkaLinkState) -> KafkaLinkState {
    let prior_source = prior.source_cluster.value().cloned().unwrap_or_default();
    let src = &vo.source_cluster;
    let source = SourceCluster {
        endpoint: non_empty(&src.endpoint).or_prior(&prior_source.endpoint),
        security_protocol: Attr::from(src.security_protocol.clone())
            .or_prior(&prior_source.security_protocol),
        sasl_mechanism: Attr::from(src.sasl_mechanism.clone()).or_prior(&prior_source.sasl_mechanism),
        user: Attr::from(src.user.clone()).or_prior(&prior_source.user),
        password: Attr::from(src.password.clone()).or_prior(&prior_source.password),
        truststore_certificates: Attr::from(src.truststore_certificates.clone())
            .or_prior(&prior_source.truststore_certificates),
        keystore_certificate_chain: Attr::from(src.keystore_certificate_chain.clone())
            .or_prior(&prior_source.keystore_certificate_chain),
        keystore_key: Attr::from(src.keystore_key.clone()).or_prior(&prior_source.keystore_key),
        disable_endpoint_identification: Attr::from(src.disable_endpoint_identification)
            .or_prior(&prior_source.disable_endpoint_identification),
    };

    KafkaLinkState {
        environment_id: prior.environment_id.clone().or_prior(&Attr::Null),
        kafka_instance_id: non_empty(&vo.instance_id).or_prior(&prior.kafka_instance_id),
        link_id: Attr::Known(vo.link_id.clone()),
        start_offset_time: non_empty(&vo.start_offset_time).or_prior(&prior.start_offset_time),
        source_cluster: Attr::Known(source),
        status: non_empty(&vo.status),
        error_message: vo.error_message.as_deref().map(non_empty).unwrap_or_default(),
        created_at: format_time(&vo.gmt_create),
        last_updated: format_time(&vo.gmt_modified),
    }
}
