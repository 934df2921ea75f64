//! Device-facing handlers: config lookup, action dispatch, live and
//! persisted state.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::Value;

use gateway_app::ports::{MessageBusPort, StateRepository};
use gateway_domain::command::CommandResponse;
use gateway_domain::device::DeviceConfig;
use gateway_domain::id::DeviceId;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn get_config<S, B>(State(state): State<AppState<S, B>>, Path(id): Path<String>) -> Result<Json<DeviceConfig>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let config = state.device_manager.get_config(&DeviceId::new(id)).await?;
    Ok(Json(config))
}

#[derive(Deserialize)]
pub struct ActionRequest {
    action: String,
    #[serde(default)]
    params: HashMap<String, Value>,
}

pub async fn action<S, B>(
    State(state): State<AppState<S, B>>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<CommandResponse>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let device_id = DeviceId::new(id);
    let result = state.device_manager.execute_action(&device_id, &body.action, &body.params, "rest").await?;
    Ok(Json(result))
}

pub async fn state<S, B>(State(state): State<AppState<S, B>>, Path(id): Path<String>) -> Result<Json<Value>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let current = state.device_manager.get_state(&DeviceId::new(id)).await?;
    Ok(Json(current.to_json()))
}

pub async fn persisted_state<S, B>(State(state): State<AppState<S, B>>, Path(id): Path<String>) -> Result<Json<Value>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let persisted = state.device_manager.get_persisted_state(&DeviceId::new(id)).await?;
    Ok(Json(persisted.to_json()))
}
