//! Event — an immutable record broadcast to SSE subscribers.
//!
//! Every mutation worth telling a client about — a device's state
//! changing, a scenario activating, the gateway's own lifecycle — is
//! published as an [`Event`] on one of three channels. Clients subscribe to
//! `GET /events?channel=...` and receive these as SSE frames.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Which SSE channel an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Devices,
    Scenarios,
    System,
}

impl Channel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Devices => "devices",
            Self::Scenarios => "scenarios",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of thing that happened, scoped within its channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    StateChanged,
    CommandExecuted,
    DeviceUnavailable,
    DeviceAvailable,
    ScenarioActivated,
    ScenarioDeactivated,
    ScenarioStepFailed,
    MaintenanceArmed,
    GatewayStarted,
    /// Synthetic event emitted by the SSE layer itself the instant a client
    /// subscribes to a channel, before any real event has happened.
    Connected,
    /// Synthetic event broadcast on every channel when the gateway begins
    /// shutting down, so subscribers can close cleanly before the process
    /// exits.
    Shutdown,
}

impl EventType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StateChanged => "state_changed",
            Self::CommandExecuted => "command_executed",
            Self::DeviceUnavailable => "device_unavailable",
            Self::DeviceAvailable => "device_available",
            Self::ScenarioActivated => "scenario_activated",
            Self::ScenarioDeactivated => "scenario_deactivated",
            Self::ScenarioStepFailed => "scenario_step_failed",
            Self::MaintenanceArmed => "maintenance_armed",
            Self::GatewayStarted => "gateway_started",
            Self::Connected => "connected",
            Self::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record broadcast to SSE subscribers of `channel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub channel: Channel,
    pub event_type: EventType,
    /// The device, scenario, or room id this event concerns, if any.
    pub subject_id: Option<String>,
    pub timestamp: Timestamp,
    pub data: serde_json::Value,
}

impl Event {
    #[must_use]
    pub fn new(
        channel: Channel,
        event_type: EventType,
        subject_id: Option<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            channel,
            event_type,
            subject_id,
            timestamp: crate::time::now(),
            data,
        }
    }
}
