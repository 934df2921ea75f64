//! Room listing — rooms are a display-only grouping (§3 Room) and carry no
//! behaviour of their own.

use axum::Json;
use axum::extract::{Path, State};

use gateway_app::ports::{MessageBusPort, StateRepository};
use gateway_domain::error::NotFoundError;
use gateway_domain::id::RoomId;
use gateway_domain::room::Room;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list<S, B>(State(state): State<AppState<S, B>>) -> Json<Vec<Room>>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    Json(state.rooms.values().cloned().collect())
}

pub async fn get<S, B>(State(state): State<AppState<S, B>>, Path(id): Path<String>) -> Result<Json<Room>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let room = state
        .rooms
        .get(&RoomId::new(id.clone()))
        .cloned()
        .ok_or(NotFoundError { entity: "Room", id })?;
    Ok(Json(room))
}
