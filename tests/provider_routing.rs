mod common;

use automq_reconciler::config::ProviderConfig;
use automq_reconciler::telemetry::{MemorySink, RequestEvent, WaitEvent};
use automq_reconciler::{
    MemoryStateSink, Provider, ReconcileEvent, RequestContext, ResourceKind, Telemetry, WaitConfig,
};
use common::{empty, ok, page, status, FakePlane};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn token_is_sent_verbatim_and_environment_is_scoped() {
    let plane = FakePlane::new();
    plane.on("GET", "/api/v1/instances/kf-1/users", [page(json!([{"name": "alice"}]))]);
    let provider = plane.provider(MemoryStateSink::new());

    let prior = json!({"environment_id": "env-7", "kafka_instance_id": "kf-1", "username": "alice", "password": "pw"});
    provider.read(&RequestContext::new(), ResourceKind::KafkaUser, prior).await.unwrap();

    let request = plane.requests().pop().unwrap();
    assert_eq!(request.authorization.as_deref(), Some("Bearer test-token"));
    assert_eq!(request.environment.as_deref(), Some("env-7"));
}

#[tokio::test]
async fn access_keys_sign_every_request() {
    let plane = FakePlane::new();
    plane.on("GET", "/api/v1/profiles/default", [ok(json!({"name": "default", "provider": "aws", "region": "us-east-1"}))]);
    let config = ProviderConfig {
        host: Some("http://cmp.test".into()),
        token: Some("Bearer ignored".into()),
        byoc_access_key: Some("AKID".into()),
        byoc_secret_key: Some("SECRET".into()),
        ..Default::default()
    };
    let provider = plane.provider_with(config, MemoryStateSink::new());

    let profile = provider.deploy_profile(&RequestContext::new(), "default").await.unwrap();
    assert_eq!(profile.region, "us-east-1");

    let auth = plane.requests().pop().unwrap().authorization.unwrap();
    assert!(auth.starts_with("AUTOMQ-HMAC-SHA256 Credential=AKID/"), "{}", auth);
    assert!(auth.contains("/private/cmp/cmp_request"));
    assert!(auth.contains("Signature="));
}

#[tokio::test]
async fn user_password_survives_reads() {
    let plane = FakePlane::new();
    plane.on("POST", "/api/v1/instances/kf-1/users", [ok(json!({"name": "alice"}))]);
    plane.on("GET", "/api/v1/instances/kf-1/users", [page(json!([{"name": "alice"}]))]);
    let provider = plane.provider(MemoryStateSink::new());
    let ctx = RequestContext::new();

    let plan = json!({"kafka_instance_id": "kf-1", "username": "alice", "password": "s3cret"});
    let created = provider.create(&ctx, ResourceKind::KafkaUser, plan).await.unwrap();
    assert_eq!(plane.last("POST", "/api/v1/instances/kf-1/users").unwrap().body["password"], "s3cret");

    let read = provider.read(&ctx, ResourceKind::KafkaUser, created).await.unwrap().unwrap();
    assert_eq!(read["password"], "s3cret");
}

#[tokio::test]
async fn integration_secrets_are_carried_forward() {
    let plane = FakePlane::new();
    plane.on("POST", "/api/v1/integrations", [ok(json!({"id": "int-1"}))]);
    plane.on(
        "GET",
        "/api/v1/integrations/int-1",
        [ok(json!({
            "id": "int-1",
            "name": "metrics",
            "type": "prometheus",
            "endpoint": "http://prom:9090/api/v1/write",
            "config": [{"key": "username", "value": "writer"}]
        }))],
    );
    let provider = plane.provider(MemoryStateSink::new());

    let plan = json!({
        "environment_id": "env-1",
        "name": "metrics",
        "type": "prometheus",
        "endpoint": "http://prom:9090/api/v1/write",
        "prometheus_config": {"username": "writer", "password": "hunter2"}
    });
    let state = provider.create(&RequestContext::new(), ResourceKind::Integration, plan).await.unwrap();
    assert_eq!(state["id"], "int-1");
    assert_eq!(state["prometheus_config"]["password"], "hunter2");
}

#[tokio::test]
async fn server_errors_name_the_operation_and_resource() {
    let plane = FakePlane::new();
    plane.on("GET", "/api/v1/instances/kf-1/topics/t-9", [status(403, "{\"code\":\"FORBIDDEN\"}")]);
    let provider = plane.provider(MemoryStateSink::new());

    let prior = json!({"kafka_instance_id": "kf-1", "topic_id": "t-9", "name": "audit"});
    let err = provider.read(&RequestContext::new(), ResourceKind::KafkaTopic, prior).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("read kafka topic kf-1/t-9"), "{}", message);
    assert!(message.contains("FORBIDDEN"), "{}", message);
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn telemetry_reports_requests_and_waits() {
    let plane = FakePlane::new();
    plane.on("GET", "/api/v1/instances/kf-1", [status(404, "gone")]);
    plane.on("DELETE", "/api/v1/instances/kf-1", [empty()]);
    let events = MemorySink::new();
    let resolved = ProviderConfig {
        host: Some("http://cmp.test".into()),
        token: Some("t".into()),
        ..Default::default()
    }
    .resolve_with(|_| None)
    .unwrap();
    let provider = Provider::builder(resolved)
        .transport(plane.transport())
        .state_sink(Arc::new(MemoryStateSink::new()))
        .telemetry(Telemetry::new(events.clone()))
        .waits(WaitConfig::instant())
        .build()
        .unwrap();

    let prior = json!({"id": "kf-1", "name": "demo"});
    provider.delete(&RequestContext::new(), ResourceKind::KafkaInstance, prior).await.unwrap();

    let events = events.events();
    assert!(events.iter().any(|e| matches!(
        e,
        ReconcileEvent::Request(RequestEvent::Failed { status: 404, .. })
    )));
    assert!(events.iter().any(|e| matches!(e, ReconcileEvent::State(_))));
    assert!(!events.iter().any(|e| matches!(e, ReconcileEvent::Wait(WaitEvent::Failed { .. }))));
}

#[tokio::test]
async fn cancelled_context_stops_before_any_request() {
    let plane = FakePlane::new();
    let provider = plane.provider(MemoryStateSink::new());
    let token = CancellationToken::new();
    token.cancel();
    let ctx = RequestContext::new().with_cancellation(token);

    let prior = json!({"kafka_instance_id": "kf-1", "topic_id": "t-1", "name": "orders"});
    let err = provider.read(&ctx, ResourceKind::KafkaTopic, prior).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(plane.requests().is_empty());
}

#[test]
fn unknown_kinds_are_rejected() {
    let err = "kafka_cluster".parse::<ResourceKind>().unwrap_err();
    assert!(err.is_validation());
    let kind: ResourceKind = "kafka_link_mirror_topic".parse().unwrap();
    assert_eq!(kind, ResourceKind::KafkaLinkMirrorTopic);
    let _: Value = serde_json::to_value(kind).unwrap();
}
