//! In-process event bus backed by one tokio broadcast channel per SSE
//! channel (`devices`/`scenarios`/`system`), plus a shutdown signal the SSE
//! layer watches to end active streams promptly.

use std::future::Future;

use tokio::sync::{broadcast, watch};

use gateway_domain::error::GatewayError;
use gateway_domain::event::{Channel, Event, EventType};

use crate::ports::EventPublisher;

/// In-process event bus using one tokio [`broadcast`] channel per channel.
///
/// Publishing succeeds even when there are no active subscribers on the
/// target channel (the event is simply dropped). Cloning shares the same
/// underlying channels (sender handles are cheap to clone), so the
/// composition root can hand the same bus to the device manager, the
/// scenario manager, and the SSE layer without wrapping it in an `Arc`
/// itself.
///
/// Keeping a separate channel per logical SSE channel (rather than one
/// shared channel filtered client-side) means a burst on `devices` can
/// never lag or drop a subscriber who only watches `system`.
#[derive(Clone)]
pub struct InProcessEventBus {
    devices: broadcast::Sender<Event>,
    scenarios: broadcast::Sender<Event>,
    system: broadcast::Sender<Event>,
    shutdown: watch::Sender<bool>,
}

impl InProcessEventBus {
    /// Create a new event bus; `capacity` bounds each channel's FIFO.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (devices, _) = broadcast::channel(capacity);
        let (scenarios, _) = broadcast::channel(capacity);
        let (system, _) = broadcast::channel(capacity);
        let (shutdown, _) = watch::channel(false);
        Self {
            devices,
            scenarios,
            system,
            shutdown,
        }
    }

    fn sender_for(&self, channel: Channel) -> &broadcast::Sender<Event> {
        match channel {
            Channel::Devices => &self.devices,
            Channel::Scenarios => &self.scenarios,
            Channel::System => &self.system,
        }
    }

    /// Subscribe to events on a single channel.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self, channel: Channel) -> broadcast::Receiver<Event> {
        self.sender_for(channel).subscribe()
    }

    /// Number of receivers currently subscribed across all three channels,
    /// for the `/events/stats` diagnostic endpoint.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.devices.receiver_count() + self.scenarios.receiver_count() + self.system.receiver_count()
    }

    /// A receiver that flips to `true` once [`InProcessEventBus::trigger_shutdown`]
    /// has been called. Each SSE stream holds its own clone and selects on
    /// it so it can exit promptly instead of running until the client
    /// disconnects.
    #[must_use]
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Broadcast a `shutdown` event on every channel (best-effort — a
    /// channel with no subscribers simply drops it) and flip the shutdown
    /// signal so every active SSE stream observing it exits.
    pub fn trigger_shutdown(&self) {
        for channel in [Channel::Devices, Channel::Scenarios, Channel::System] {
            let _ = self
                .sender_for(channel)
                .send(Event::new(channel, EventType::Shutdown, None, serde_json::json!({})));
        }
        let _ = self.shutdown.send(true);
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), GatewayError>> + Send {
        // broadcast::send fails only when there are zero receivers,
        // which is fine — we simply ignore the error.
        let _ = self.sender_for(event.channel).send(event);
        async { Ok(()) }
    }
}
