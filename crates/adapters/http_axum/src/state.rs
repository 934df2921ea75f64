//! Shared application state for axum handlers.

use std::collections::HashMap;
use std::sync::Arc;

use gateway_app::event_bus::InProcessEventBus;
use gateway_app::ports::{MessageBusPort, StateRepository};
use gateway_app::services::device_manager::DeviceManager;
use gateway_app::services::scenario_manager::ScenarioManager;
use gateway_domain::id::RoomId;
use gateway_domain::room::Room;

/// Application state shared across all axum handlers.
///
/// The event publisher is fixed to [`InProcessEventBus`] rather than left
/// generic: SSE streaming needs `subscribe`, which isn't (and shouldn't be)
/// part of the `EventPublisher` port, so this adapter depends on the
/// concrete in-process bus the composition root wires up.
pub struct AppState<S, B> {
    pub device_manager: Arc<DeviceManager<S, B, InProcessEventBus>>,
    pub scenario_manager: Arc<ScenarioManager<S, B, InProcessEventBus>>,
    pub event_bus: Arc<InProcessEventBus>,
    pub rooms: Arc<HashMap<RoomId, Room>>,
    pub version: Arc<str>,
    pub mqtt_broker: Arc<str>,
}

impl<S, B> Clone for AppState<S, B> {
    fn clone(&self) -> Self {
        Self {
            device_manager: Arc::clone(&self.device_manager),
            scenario_manager: Arc::clone(&self.scenario_manager),
            event_bus: Arc::clone(&self.event_bus),
            rooms: Arc::clone(&self.rooms),
            version: Arc::clone(&self.version),
            mqtt_broker: Arc::clone(&self.mqtt_broker),
        }
    }
}

impl<S, B> AppState<S, B>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
{
    #[must_use]
    pub fn new(
        device_manager: Arc<DeviceManager<S, B, InProcessEventBus>>,
        scenario_manager: Arc<ScenarioManager<S, B, InProcessEventBus>>,
        event_bus: Arc<InProcessEventBus>,
        rooms: HashMap<RoomId, Room>,
        version: impl Into<Arc<str>>,
        mqtt_broker: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            device_manager,
            scenario_manager,
            event_bus,
            rooms: Arc::new(rooms),
            version: version.into(),
            mqtt_broker: mqtt_broker.into(),
        }
    }
}
