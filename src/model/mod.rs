//! Desired-state objects and their mapping to and from wire payloads.
//!
//! Every resource has `expand` functions (desired state to request body) and a
//! `flatten(response, prior)` function (server view to state). `flatten` takes the
//! prior state because some fields (passwords, keystore material, bearer tokens) are
//! never returned by the server and must be carried forward.

pub mod acl;
mod attr;
pub mod common;
pub mod instance;
pub mod integration;
pub mod kafka_link;
pub mod mirror;
pub mod topic;
pub mod user;

pub use acl::AclState;
pub use attr::{Attr, UNKNOWN_MARKER};
pub use common::{ConfigMap, Timeouts};
pub use instance::{ComputeSpecs, Endpoint, InstanceDetails, InstanceState, Network};
pub use integration::{
    CloudWatchConfig, IntegrationState, IntegrationType, KafkaIntegrationConfig, PrometheusConfig,
};
pub use kafka_link::{KafkaLinkState, SourceCluster, StartOffsetTime};
pub use mirror::{MirrorGroupState, MirrorTopicState};
pub use topic::TopicState;
pub use user::UserState;

/// Order `server` like `prior` when both hold the same elements, so a set-valued
/// attribute does not show a spurious diff. Otherwise `server` is returned sorted.
pub(crate) fn align_order(mut server: Vec<String>, prior: &[String]) -> Vec<String> {
    let mut a = server.clone();
    let mut b = prior.to_vec();
    a.sort();
    b.sort();
    if a == b {
        prior.to_vec()
    } else {
        server.sort();
        server
    }
}
