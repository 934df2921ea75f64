//! `GET /system` — process-level identity and inventory summary.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use gateway_app::ports::{MessageBusPort, StateRepository};

use crate::state::AppState;

#[derive(Serialize)]
pub struct SystemResponse {
    version: String,
    mqtt_broker: String,
    devices: Vec<String>,
    scenarios: Vec<String>,
    rooms: Vec<String>,
}

pub async fn get<S, B>(State(state): State<AppState<S, B>>) -> Json<SystemResponse>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let devices = state.device_manager.list_configs().await.into_iter().map(|c| c.device_id.to_string()).collect();
    let scenarios = state
        .scenario_manager
        .list_definitions()
        .await
        .into_iter()
        .map(|d| d.scenario_id.to_string())
        .collect();
    let rooms = state.rooms.keys().map(ToString::to_string).collect();

    Json(SystemResponse {
        version: state.version.to_string(),
        mqtt_broker: state.mqtt_broker.to_string(),
        devices,
        scenarios,
        rooms,
    })
}
