//! JSON REST API handler modules.

pub mod admin;
pub mod devices;
pub mod events;
pub mod rooms;
pub mod scenario;
pub mod system;

use axum::Router;
use axum::routing::{get, post};

use gateway_app::ports::{MessageBusPort, StateRepository};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S, B>() -> Router<AppState<S, B>>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    Router::new()
        .route("/system", get(system::get))
        .route("/config/device/{id}", get(devices::get_config))
        .route("/devices/{id}/action", post(devices::action))
        .route("/devices/{id}/state", get(devices::state))
        .route("/devices/{id}/persisted_state", get(devices::persisted_state))
        .route("/publish", post(admin::publish))
        .route("/scenario/switch", post(scenario::switch))
        .route("/scenario/start", post(scenario::start))
        .route("/scenario/shutdown", post(scenario::shutdown))
        .route("/scenario/role_action", post(scenario::role_action))
        .route("/scenario/state", get(scenario::scenario_state))
        .route("/scenario/definition", get(scenario::definition_list))
        .route("/scenario/definition/{id}", get(scenario::definition_get))
        .route("/scenario/virtual_config", get(scenario::virtual_config_list))
        .route("/scenario/virtual_config/{id}", get(scenario::virtual_config_get))
        .route("/room/list", get(rooms::list))
        .route("/room/{id}", get(rooms::get))
        .route("/events/{channel}", get(events::by_channel))
        .route("/events/stats", get(events::stats))
}
