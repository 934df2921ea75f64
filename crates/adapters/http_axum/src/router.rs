//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use gateway_app::ports::{MessageBusPort, StateRepository};

use crate::state::AppState;

/// Build the top-level axum [`Router`], merging `/api` routes under the
/// shared [`AppState`] with a plain `/health` liveness check, and a
/// `TraceLayer` logging every request/response at the tracing subscriber's
/// configured level.
#[must_use]
pub fn build<S, B>(state: AppState<S, B>) -> Router
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}
