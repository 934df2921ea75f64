//! Administrative escape hatch: publish an arbitrary MQTT message,
//! bypassing the device/command pipeline entirely.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;

use gateway_app::ports::{MessageBusPort, StateRepository};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PublishRequest {
    topic: String,
    payload: String,
    #[serde(default)]
    retain: bool,
}

pub async fn publish<S, B>(State(state): State<AppState<S, B>>, Json(body): Json<PublishRequest>) -> Result<Json<Value>, ApiError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    state.device_manager.publish_raw(&body.topic, body.payload.into_bytes(), body.retain).await?;
    Ok(Json(serde_json::json!({})))
}
