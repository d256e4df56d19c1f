//! SSE adapter integration tests driven over a real in-process HTTP server
//! (`axum-test`), covering the boundary behaviors in §8.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use plasma::config::CliArgs;
use plasma::core::EventLoop;
use plasma::metrics::Metrics;
use plasma::pubsub::PubSub;
use plasma::router;
use plasma::state::AppState;
use plasma::upstream::mock::MockDriver;
use plasma::upstream::SharedDriver;

fn test_state() -> AppState {
    test_state_with(&["plasma"])
}

fn test_state_with(argv: &[&str]) -> AppState {
    let metrics = Metrics::new();
    let (event_loop, handle) = EventLoop::new(metrics.clone());
    tokio::spawn(event_loop.run());

    let bus = Arc::new(PubSub::new());
    let forwarding = handle.clone();
    bus.subscribe(move |payload| forwarding.publish_now(payload));

    let driver: SharedDriver = Arc::new(MockDriver::new(Duration::from_secs(1)));
    let args = CliArgs::parse_from(argv);

    AppState {
        event_loop: handle,
        bus,
        metrics,
        driver,
        config: Arc::new(args),
    }
}

#[tokio::test]
async fn missing_event_query_is_rejected() {
    let app = router::build(test_state());
    let server = axum_test::TestServer::new(app).unwrap();

    let response = server.get("/events").await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn empty_event_query_is_rejected() {
    let app = router::build(test_state());
    let server = axum_test::TestServer::new(app).unwrap();

    let response = server.get("/events").add_query_param("eventType", "").await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn health_check_reports_ok_for_mock_driver() {
    let app = router::build(test_state());
    let server = axum_test::TestServer::new(app).unwrap();

    let response = server.get("/hc").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn debug_endpoint_is_absent_when_debug_disabled() {
    let app = router::build(test_state());
    let server = axum_test::TestServer::new(app).unwrap();

    let response = server
        .post("/debug")
        .json(&serde_json::json!({"meta": {"type": "a"}, "data": "x"}))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn invalid_event_type_is_rejected() {
    let app = router::build(test_state());
    let server = axum_test::TestServer::new(app).unwrap();

    let response = server
        .get("/events")
        .add_query_param("eventType", "a::b")
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn debug_endpoint_accepts_a_payload_when_enabled() {
    let app = router::build(test_state_with(&["plasma", "--debug"]));
    let server = axum_test::TestServer::new(app).unwrap();

    // `/debug` decodes the same nested `Payload` shape `/publish` does
    // (see DESIGN.md) — both originals decode into `event.Payload`.
    let response = server
        .post("/debug")
        .json(&serde_json::json!({
            "meta": {"type": "program:1234:views"},
            "data": {"views": 55301},
        }))
        .await;
    response.assert_status(axum::http::StatusCode::ACCEPTED);
}

#[tokio::test]
async fn debug_endpoint_rejects_invalid_event_type() {
    let app = router::build(test_state_with(&["plasma", "--debug"]));
    let server = axum_test::TestServer::new(app).unwrap();

    let response = server
        .post("/debug")
        .json(&serde_json::json!({"meta": {"type": "a::b"}, "data": "x"}))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn debug_endpoint_rejects_redis_subscriber_with_no_configured_channel() {
    let app = router::build(test_state_with(&["plasma", "--debug", "--subscriber-type", "redis"]));
    let server = axum_test::TestServer::new(app).unwrap();

    // No `--subscriber-redis-channels` configured, so there is nowhere to
    // republish onto — rejected before ever attempting to dial Redis.
    let response = server
        .post("/debug")
        .json(&serde_json::json!({"meta": {"type": "program:1234:views"}, "data": {"views": 1}}))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn publish_endpoint_is_absent_unless_subscriber_type_is_api() {
    let app = router::build(test_state_with(&["plasma", "--subscriber-type", "mock"]));
    let server = axum_test::TestServer::new(app).unwrap();

    let response = server
        .post("/publish")
        .json(&serde_json::json!({"type": "a", "data": "x"}))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn publish_endpoint_accepts_and_republishes_when_subscriber_type_is_api() {
    let app = router::build(test_state_with(&["plasma", "--subscriber-type", "api"]));
    let server = axum_test::TestServer::new(app).unwrap();

    // `ingest` decodes straight into `Payload`, whose wire shape nests
    // `type` under `meta` (unlike `/debug`'s flat body) — see DESIGN.md.
    let response = server
        .post("/publish")
        .json(&serde_json::json!({
            "meta": {"type": "program:1234:views"},
            "data": {"views": 55301},
        }))
        .await;
    response.assert_status(axum::http::StatusCode::ACCEPTED);
}

#[tokio::test]
async fn publish_endpoint_rejects_invalid_event_type() {
    let app = router::build(test_state_with(&["plasma", "--subscriber-type", "api"]));
    let server = axum_test::TestServer::new(app).unwrap();

    let response = server
        .post("/publish")
        .json(&serde_json::json!({"meta": {"type": "a::b"}, "data": "x"}))
        .await;
    response.assert_status_bad_request();
}
