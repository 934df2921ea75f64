//! End-to-end smoke tests for the full gatewayd stack.
//!
//! Each test spins up the complete application (in-memory `SQLite`, a real
//! state repository, a stub message bus, real services, real axum router)
//! and exercises the HTTP layer via `tower::ServiceExt::oneshot` — no TCP
//! port is bound and no MQTT broker is required.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use gateway_adapter_http_axum::router;
use gateway_adapter_http_axum::state::AppState;
use gateway_adapter_storage_sqlite_sqlx::{Config, SqliteStateRepository};
use gateway_adapter_virtual::{demo_device_config, VirtualAvDriver};
use gateway_app::event_bus::InProcessEventBus;
use gateway_app::ports::{BusMessage, MessageBusPort, StateRepository};
use gateway_app::services::device_manager::DeviceManager;
use gateway_app::services::scenario_manager::ScenarioManager;
use gateway_app::services::scenario_wb_adapter;
use gateway_domain::error::GatewayError;
use gateway_domain::id::DeviceId;
use gateway_domain::maintenance::MaintenanceGuard;
use gateway_domain::scenario::{CommandStep, ScenarioDefinition};

/// A [`MessageBusPort`] that records every publish in memory instead of
/// talking to a broker — enough to exercise the device/scenario command
/// pipeline without a real MQTT connection.
#[derive(Default, Clone)]
struct StubBus;

impl MessageBusPort for StubBus {
    fn publish(&self, _topic: &str, _payload: Vec<u8>, _retain: bool) -> impl Future<Output = Result<(), GatewayError>> + Send {
        async { Ok(()) }
    }
    fn subscribe(&self, _topic_filter: &str) -> impl Future<Output = Result<(), GatewayError>> + Send {
        async { Ok(()) }
    }
    fn add_will_message(&self, _device_id: &DeviceId, _topic: &str, _payload: Vec<u8>, _retain: bool) -> impl Future<Output = Result<(), GatewayError>> + Send {
        async { Ok(()) }
    }
    fn remove_device_will_messages(&self, _device_id: &DeviceId) -> impl Future<Output = Result<(), GatewayError>> + Send {
        async { Ok(()) }
    }
}

// Silence an unused-import warning when BusMessage isn't referenced directly
// in every test (kept for readers wiring a real bus adapter by comparison).
#[allow(dead_code)]
fn _bus_message_shape(_m: &BusMessage) {}

struct Harness {
    router: axum::Router,
    #[allow(dead_code)]
    pool: sqlx::SqlitePool,
}

/// Build a fully-wired router backed by an in-memory `SQLite` database, one
/// registered virtual AV device, and one scenario referencing it —
/// mirroring the composition root in `main.rs` but with a stub bus.
async fn app_with_demo_scenario() -> Harness {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise");
    let pool = db.pool().clone();

    let event_bus = InProcessEventBus::new(64);

    let device_manager = Arc::new(DeviceManager::new(
        SqliteStateRepository::new(pool.clone()),
        StubBus,
        event_bus.clone(),
        MaintenanceGuard::default(),
    ));

    let config = demo_device_config("tv1", "Living Room TV");
    device_manager
        .register_device(config, Box::new(VirtualAvDriver::new(DeviceId::new("tv1"), "Living Room TV")))
        .await
        .expect("demo device should register");

    let scenario_manager = Arc::new(ScenarioManager::new(
        SqliteStateRepository::new(pool.clone()),
        Arc::clone(&device_manager),
        event_bus.clone(),
    ));

    let movie_night = ScenarioDefinition::builder()
        .scenario_id("movie_night")
        .name("Movie Night")
        .device("tv1")
        .role("display", "tv1")
        .startup_step(CommandStep {
            device: DeviceId::new("tv1"),
            command: "power_on".to_string(),
            params: HashMap::new(),
            condition: None,
            delay_after_ms: 0,
        })
        .build()
        .expect("scenario definition should validate");

    scenario_manager.load_scenarios(vec![movie_night], &HashMap::new()).await;
    scenario_manager.initialize().await.expect("scenario restore should succeed");
    scenario_wb_adapter::register_all(&device_manager, &scenario_manager)
        .await
        .expect("scenario wb devices should register");

    let state = AppState::new(device_manager, scenario_manager, Arc::new(event_bus), HashMap::new(), "0.1.0-test", "localhost:1883");

    Harness {
        router: router::build(state),
        pool,
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn should_return_ok_from_health_check() {
    let harness = app_with_demo_scenario().await;
    let response = harness.router.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn should_list_registered_device_and_scenario_under_system() {
    let harness = app_with_demo_scenario().await;
    let response = harness.router.oneshot(Request::builder().uri("/api/system").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["devices"], serde_json::json!(["tv1"]));
    assert_eq!(json["scenarios"], serde_json::json!(["movie_night"]));
}

#[tokio::test]
async fn should_execute_device_action_and_persist_resulting_state() {
    let harness = app_with_demo_scenario().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/devices/tv1/action")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({"action": "power_on"}).to_string()))
        .unwrap();
    let response = harness.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder().uri("/api/devices/tv1/state").body(Body::empty()).unwrap();
    let response = harness.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["power"], serde_json::json!("on"));

    // Persisted state must agree with the live snapshot — the command
    // pipeline writes through on every successful action.
    let persisted = SqliteStateRepository::new(harness.pool.clone())
        .load_device_state(&DeviceId::new("tv1"))
        .await
        .unwrap()
        .expect("state should have been persisted");
    assert_eq!(persisted.power, gateway_domain::state::PowerState::On);
}

#[tokio::test]
async fn should_reject_action_on_unknown_device() {
    let harness = app_with_demo_scenario().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/devices/missing/action")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({"action": "power_on"}).to_string()))
        .unwrap();
    let response = harness.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_switch_scenario_and_report_active_state() {
    let harness = app_with_demo_scenario().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/scenario/switch")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({"id": "movie_night"}).to_string()))
        .unwrap();
    let response = harness.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder().uri("/api/scenario/state").body(Body::empty()).unwrap();
    let response = harness.router.clone().oneshot(request).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["active_scenario"], serde_json::json!("movie_night"));
}

#[tokio::test]
async fn should_execute_role_action_against_active_scenario() {
    let harness = app_with_demo_scenario().await;

    let switch = Request::builder()
        .method("POST")
        .uri("/api/scenario/switch")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({"id": "movie_night"}).to_string()))
        .unwrap();
    harness.router.clone().oneshot(switch).await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/scenario/role_action")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({"role": "display", "command": "power_off"}).to_string()))
        .unwrap();
    let response = harness.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder().uri("/api/devices/tv1/state").body(Body::empty()).unwrap();
    let response = harness.router.oneshot(request).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["power"], serde_json::json!("off"));
}

#[tokio::test]
async fn should_reject_unknown_scenario_switch() {
    let harness = app_with_demo_scenario().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/scenario/switch")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({"id": "does_not_exist"}).to_string()))
        .unwrap();
    let response = harness.router.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error() || response.status().is_server_error());
}

#[tokio::test]
async fn should_report_event_stats_with_no_subscribers() {
    let harness = app_with_demo_scenario().await;
    let response = harness.router.oneshot(Request::builder().uri("/api/events/stats").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["subscriber_count"], serde_json::json!(0));
}

#[tokio::test]
async fn should_404_on_unknown_event_channel() {
    let harness = app_with_demo_scenario().await;
    let response = harness.router.oneshot(Request::builder().uri("/api/events/nonsense").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
