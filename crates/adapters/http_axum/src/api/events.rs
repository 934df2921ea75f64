//! Server-sent event streams, one per channel, plus a stats endpoint
//! reporting the in-process bus's active subscriber count.
//!
//! Each stream: emits a `connected` frame the instant a client subscribes,
//! emits a `keepalive` comment whenever a second passes with no real event,
//! and ends promptly when the gateway broadcasts its shutdown signal.

use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, Sse};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::Stream;

use gateway_app::ports::{MessageBusPort, StateRepository};
use gateway_domain::event::{Channel, Event, EventType};

use crate::state::AppState;

fn sse_frame(event: &Event) -> Option<SseEvent> {
    serde_json::to_string(event).ok().map(|json| SseEvent::default().data(json))
}

fn channel_stream<S, B>(state: &AppState<S, B>, channel: Channel) -> impl Stream<Item = Result<SseEvent, Infallible>> + Send + 'static
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let mut rx = state.event_bus.subscribe(channel);
    let mut shutdown = state.event_bus.shutdown_signal();

    stream! {
        if let Some(frame) = sse_frame(&Event::new(channel, EventType::Connected, None, serde_json::json!({}))) {
            yield Ok(frame);
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.tick().await; // first tick fires immediately, skip it

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            ticker.reset();
                            let is_shutdown = event.event_type == EventType::Shutdown;
                            if let Some(frame) = sse_frame(&event) {
                                yield Ok(frame);
                            }
                            if is_shutdown {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = ticker.tick() => {
                    yield Ok(SseEvent::default().comment("keepalive"));
                }
            }
        }
    }
}

/// `GET /events/{devices|scenarios|system}` — SSE stream of events on the
/// named channel. Any other path segment is a 404.
pub async fn by_channel<S, B>(
    State(state): State<AppState<S, B>>,
    Path(name): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, StatusCode>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    let channel = match name.as_str() {
        "devices" => Channel::Devices,
        "scenarios" => Channel::Scenarios,
        "system" => Channel::System,
        _ => return Err(StatusCode::NOT_FOUND),
    };
    Ok(Sse::new(channel_stream(&state, channel)))
}

#[derive(Serialize)]
pub struct EventStats {
    subscriber_count: usize,
}

pub async fn stats<S, B>(State(state): State<AppState<S, B>>) -> Json<EventStats>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    Json(EventStats {
        subscriber_count: state.event_bus.subscriber_count(),
    })
}
