//! Scenario-facing handlers: switching, starting, shutting down, role
//! actions, state, definitions, and the synthetic WB config each scenario
//! is published under.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use gateway_app::ports::{MessageBusPort, StateRepository};
use gateway_app::services::scenario_manager::SwitchResult;
use gateway_app::services::scenario_wb_adapter::build_virtual_config;
use gateway_domain::command::CommandResponse;
use gateway_domain::device::DeviceConfig;
use gateway_domain::id::ScenarioId;
use gateway_domain::scenario::ScenarioDefinition;

use gateway_domain::error::ScenarioError;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SwitchRequest {
    id: String,
    #[serde(default = "default_graceful")]
    graceful: bool,
}

#[derive(Deserialize)]
pub struct IdRequest {
    id: String,
}

#[derive(Deserialize)]
pub struct ShutdownRequest {
    id: String,
    #[serde(default = "default_graceful")]
    graceful: bool,
}

#[derive(Deserialize)]
pub struct RoleActionRequest {
    role: String,
    command: String,
    #[serde(default)]
    params: HashMap<String, Value>,
}

fn default_graceful() -> bool {
    true
}

pub async fn switch<S, B>(State(state): State<AppState<S, B>>, Json(body): Json<SwitchRequest>) -> Result<Json<SwitchResult>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let result = state.scenario_manager.switch_scenario(&ScenarioId::new(body.id), body.graceful).await?;
    Ok(Json(result))
}

pub async fn start<S, B>(State(state): State<AppState<S, B>>, Json(body): Json<IdRequest>) -> Result<Json<SwitchResult>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let result = state.scenario_manager.start_scenario(&ScenarioId::new(body.id)).await?;
    Ok(Json(result))
}

pub async fn shutdown<S, B>(State(state): State<AppState<S, B>>, Json(body): Json<ShutdownRequest>) -> Result<Json<Value>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    state.scenario_manager.shutdown_scenario(&ScenarioId::new(body.id), body.graceful).await?;
    Ok(Json(serde_json::json!({})))
}

pub async fn role_action<S, B>(
    State(state): State<AppState<S, B>>,
    Json(body): Json<RoleActionRequest>,
) -> Result<Json<CommandResponse>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let result = state.scenario_manager.execute_current_role_action(&body.role, &body.command, &body.params).await?;
    Ok(Json(result))
}

#[derive(Serialize)]
pub struct ScenarioStateResponse {
    active_scenario: Option<String>,
    since: Option<String>,
}

pub async fn scenario_state<S, B>(State(state): State<AppState<S, B>>) -> Result<Json<ScenarioStateResponse>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let current = state.scenario_manager.scenario_state().await?;
    Ok(Json(ScenarioStateResponse {
        active_scenario: current.active_scenario.map(|id| id.to_string()),
        since: current.since.map(|ts| ts.to_rfc3339()),
    }))
}

pub async fn definition_list<S, B>(State(state): State<AppState<S, B>>) -> Json<Vec<ScenarioDefinition>>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    Json(state.scenario_manager.list_definitions().await)
}

pub async fn definition_get<S, B>(
    State(state): State<AppState<S, B>>,
    Path(id): Path<String>,
) -> Result<Json<ScenarioDefinition>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let definition = state
        .scenario_manager
        .definition(&ScenarioId::new(id.clone()))
        .await
        .ok_or_else(|| ScenarioError::UnknownScenario(id))?;
    Ok(Json(definition))
}

pub async fn virtual_config_list<S, B>(State(state): State<AppState<S, B>>) -> Json<Vec<DeviceConfig>>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let device_configs = state.device_manager.list_configs().await;
    let configs = state
        .scenario_manager
        .list_definitions()
        .await
        .into_iter()
        .map(|definition| build_virtual_config(&definition, &device_configs))
        .collect();
    Json(configs)
}

pub async fn virtual_config_get<S, B>(
    State(state): State<AppState<S, B>>,
    Path(id): Path<String>,
) -> Result<Json<DeviceConfig>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let definition = state
        .scenario_manager
        .definition(&ScenarioId::new(id.clone()))
        .await
        .ok_or_else(|| ScenarioError::UnknownScenario(id))?;
    let device_configs = state.device_manager.list_configs().await;
    Ok(Json(build_virtual_config(&definition, &device_configs)))
}
