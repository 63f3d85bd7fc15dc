mod common;

use automq_reconciler::{MemoryStateSink, RequestContext, ResourceKind};
use common::{empty, ok, page, status, FakePlane};
use serde_json::{json, Value};

const INSTANCE: &str = "/api/v1/instances/kf-1";

fn instance(state: &str) -> Value {
    json!({
        "instanceId": "kf-1",
        "displayName": "demo",
        "provider": "aliyun",
        "region": "cn-hangzhou",
        "state": state,
        "networks": [{"zone": "cn-hangzhou-b", "subnet": "vsw-1"}],
        "spec": {"version": "1.3.10", "values": [{"key": "aku", "value": "6"}]},
        "aclEnabled": false,
        "gmtCreate": "2024-05-01T08:00:00Z"
    })
}

fn demo_plan() -> Value {
    json!({
        "environment_id": "env-1",
        "name": "demo",
        "cloud_provider": "alicloud",
        "region": "cn-hangzhou",
        "networks": [{"zone": "cn-hangzhou-b", "subnets": ["vsw-1"]}],
        "compute_specs": {"aku": 6, "version": "1.3.10"},
        "acl": false
    })
}

fn serve_details(plane: &FakePlane) {
    plane
        .on("GET", &format!("{}/integrations", INSTANCE), [page(json!([]))])
        .on(
            "GET",
            &format!("{}/endpoints", INSTANCE),
            [page(json!([{
                "displayName": "default",
                "networkType": "VPC",
                "protocol": "PLAINTEXT",
                "mechanisms": "",
                "bootstrapServers": "kf-1.automq.internal:9092"
            }]))],
        )
        .on("GET", &format!("{}/configurations", INSTANCE), [page(json!([]))]);
}

#[tokio::test]
async fn create_then_delete_instance() {
    let plane = FakePlane::new();
    plane.on("POST", "/api/v1/instances", [ok(instance("Creating"))]);
    plane.on(
        "GET",
        INSTANCE,
        [ok(instance("Creating")), ok(instance("Creating")), ok(instance("Available"))],
    );
    serve_details(&plane);

    let sink = MemoryStateSink::new();
    let provider = plane.provider(sink.clone());
    let ctx = RequestContext::new();

    let state = provider.create(&ctx, ResourceKind::KafkaInstance, demo_plan()).await.unwrap();

    let post = plane.last("POST", "/api/v1/instances").unwrap();
    assert_eq!(post.body["provider"], "aliyun");
    assert_eq!(post.body["displayName"], "demo");
    assert_eq!(post.body["spec"]["values"], json!([{"key": "aku", "value": "6"}]));
    assert_eq!(post.body["networks"], json!([{"zone": "cn-hangzhou-b", "subnet": "vsw-1"}]));
    assert_eq!(post.environment.as_deref(), Some("env-1"));

    assert_eq!(state["id"], "kf-1");
    assert_eq!(state["cloud_provider"], "alicloud");
    assert_eq!(state["instance_status"], "Running");
    assert_eq!(state["endpoints"][0]["bootstrap_servers"], "kf-1.automq.internal:9092");

    // pending snapshot first, final state last
    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].state.as_ref().unwrap()["instance_status"], "Creating");
    assert_eq!(records[0].state.as_ref().unwrap()["id"], "kf-1");
    assert_eq!(sink.latest::<Value>("kafka_instance").unwrap()["instance_status"], "Running");

    plane.clear_requests();
    plane.on(
        "GET",
        INSTANCE,
        [ok(instance("Available")), ok(instance("Deleting")), status(404, "instance not found")],
    );
    plane.on("DELETE", INSTANCE, [empty()]);

    provider.delete(&ctx, ResourceKind::KafkaInstance, state).await.unwrap();

    assert_eq!(plane.writes(), vec![format!("DELETE {}", INSTANCE)]);
    assert_eq!(plane.calls("GET", INSTANCE), 3);
    assert!(sink.latest::<Value>("kafka_instance").is_none());
}

#[tokio::test]
async fn delete_skips_the_call_while_already_deleting() {
    let plane = FakePlane::new();
    plane.on("GET", INSTANCE, [ok(instance("Deleting")), status(404, "gone")]);
    let provider = plane.provider(MemoryStateSink::new());

    let prior = json!({"environment_id": "env-1", "id": "kf-1", "name": "demo"});
    provider.delete(&RequestContext::new(), ResourceKind::KafkaInstance, prior).await.unwrap();
    assert!(plane.writes().is_empty());
}

#[tokio::test]
async fn error_status_fails_the_create() {
    let plane = FakePlane::new();
    plane.on("POST", "/api/v1/instances", [ok(instance("Creating"))]);
    plane.on("GET", INSTANCE, [ok(instance("Error"))]);
    let sink = MemoryStateSink::new();
    let provider = plane.provider(sink.clone());

    let err = provider
        .create(&RequestContext::new(), ResourceKind::KafkaInstance, demo_plan())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Kafka Cluster kf-1 status is Error");
    // the id is kept so the next run can adopt or clean up the instance
    assert_eq!(sink.latest::<Value>("kafka_instance").unwrap()["id"], "kf-1");
}

#[tokio::test]
async fn update_rejections_issue_no_requests() {
    let plane = FakePlane::new();
    let provider = plane.provider(MemoryStateSink::new());
    let ctx = RequestContext::new();

    let mut prior = demo_plan();
    prior["id"] = json!("kf-1");
    prior["acl"] = json!(true);
    prior["configs"] = json!({"log.retention.ms": "3600000"});

    let mut acl_off = prior.clone();
    acl_off["acl"] = json!(false);
    let err = provider
        .update(&ctx, ResourceKind::KafkaInstance, prior.clone(), acl_off)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("acl cannot be disabled"));

    let mut fewer_configs = prior.clone();
    fewer_configs["configs"] = json!({});
    let err = provider
        .update(&ctx, ResourceKind::KafkaInstance, prior.clone(), fewer_configs)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("log.retention.ms"));

    let mut moved = prior.clone();
    moved["region"] = json!("cn-shanghai");
    let err = provider
        .update(&ctx, ResourceKind::KafkaInstance, prior, moved)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    assert!(plane.requests().is_empty());
}

#[tokio::test]
async fn update_requires_an_available_instance() {
    let plane = FakePlane::new();
    plane.on("GET", INSTANCE, [ok(instance("Changing"))]);
    let provider = plane.provider(MemoryStateSink::new());

    let mut prior = demo_plan();
    prior["id"] = json!("kf-1");
    let mut plan = prior.clone();
    plan["name"] = json!("demo-2");

    let err = provider
        .update(&RequestContext::new(), ResourceKind::KafkaInstance, prior, plan)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("Changing"));
    assert!(plane.writes().is_empty());
}

#[tokio::test]
async fn interrupted_update_resumes_with_the_remaining_step() {
    let plane = FakePlane::new();
    plane.on("GET", INSTANCE, [ok(instance("Available"))]);
    plane.on("PATCH", &format!("{}/basic", INSTANCE), [empty()]);
    plane.on("PATCH", &format!("{}/spec", INSTANCE), [status(500, "scaling backend unavailable")]);
    serve_details(&plane);

    let sink = MemoryStateSink::new();
    let provider = plane.provider(sink.clone());
    let ctx = RequestContext::new();

    let mut prior = demo_plan();
    prior["id"] = json!("kf-1");
    let mut plan = prior.clone();
    plan["name"] = json!("demo-2");
    plan["compute_specs"]["aku"] = json!(8);

    let err = provider
        .update(&ctx, ResourceKind::KafkaInstance, prior, plan.clone())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("scaling backend unavailable"));

    // the rename landed, the resize did not
    let saved: Value = sink.latest("kafka_instance").unwrap();
    assert_eq!(saved["name"], "demo-2");
    assert_eq!(saved["compute_specs"]["aku"], 6);

    plane.clear_requests();
    plane.on("PATCH", &format!("{}/spec", INSTANCE), [empty()]);
    provider.update(&ctx, ResourceKind::KafkaInstance, saved, plan).await.unwrap();

    assert_eq!(plane.writes(), vec![format!("PATCH {}/spec", INSTANCE)]);
    let spec = plane.last("PATCH", &format!("{}/spec", INSTANCE)).unwrap();
    assert_eq!(spec.body, json!({"values": [{"key": "aku", "value": "8"}]}));
}

#[tokio::test]
async fn import_adopts_every_server_config() {
    let plane = FakePlane::new();
    plane.on("GET", INSTANCE, [ok(instance("Available"))]);
    serve_details(&plane);
    plane.on(
        "GET",
        &format!("{}/configurations", INSTANCE),
        [page(json!([{"key": "auto.create.topics.enable", "value": "false"}]))],
    );
    let sink = MemoryStateSink::new();
    let provider = plane.provider(sink.clone());

    let state = provider
        .import(&RequestContext::new(), ResourceKind::KafkaInstance, "env-1@kf-1")
        .await
        .unwrap();
    assert_eq!(state["environment_id"], "env-1");
    assert_eq!(state["configs"], json!({"auto.create.topics.enable": "false"}));
    assert_eq!(plane.last("GET", INSTANCE).unwrap().environment.as_deref(), Some("env-1"));
    assert!(sink.latest::<Value>("kafka_instance").is_some());

    let err = provider
        .import(&RequestContext::new(), ResourceKind::KafkaInstance, "env-1@")
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn instance_data_source_reads_endpoints() {
    let plane = FakePlane::new();
    plane.on("GET", INSTANCE, [ok(instance("Available"))]);
    serve_details(&plane);
    let provider = plane.provider(MemoryStateSink::new());

    let state = provider.instance(&RequestContext::new(), "env-1", "kf-1").await.unwrap();
    let endpoints = state.endpoints.value().unwrap();
    assert_eq!(endpoints[0].bootstrap_servers, "kf-1.automq.internal:9092");

    let err = provider.instance(&RequestContext::new(), "env-1", "kf-404").await.unwrap_err();
    assert!(err.is_not_found());
}
