//! Storage port — persistence for device state and scenario state.
//!
//! A single logical key-value table: callers read and write whole
//! [`DeviceState`] and [`ScenarioState`] values by key, rather than the
//! storage layer understanding per-field schemas. This mirrors how the
//! gateway's predecessor persisted state — one row per key, timestamped on
//! write — and keeps the storage adapter generic over whatever shape of
//! state a device class happens to carry in its `extra` bag.

use std::future::Future;

use gateway_domain::error::GatewayError;
use gateway_domain::id::DeviceId;
use gateway_domain::scenario::ScenarioState;
use gateway_domain::state::DeviceState;

/// Persists device and scenario state across restarts.
pub trait StateRepository: Send + Sync {
    /// Persist (or overwrite) the state of one device.
    fn save_device_state(
        &self,
        state: &DeviceState,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Load the last-persisted state of a device, if any row exists.
    fn load_device_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceState>, GatewayError>> + Send;

    /// Load every persisted device state, used to seed the registry on
    /// startup.
    fn load_all_device_states(
        &self,
    ) -> impl Future<Output = Result<Vec<DeviceState>, GatewayError>> + Send;

    /// Persist which scenario is active (or that none is).
    fn save_scenario_state(
        &self,
        state: &ScenarioState,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Load the persisted active-scenario record, defaulting to "none
    /// active" when nothing has ever been saved.
    fn load_scenario_state(
        &self,
    ) -> impl Future<Output = Result<ScenarioState, GatewayError>> + Send;

    /// Flush and release any underlying connection resources. Called once,
    /// as the last step of shutdown; operations performed after `close()`
    /// has returned are not guaranteed to succeed.
    fn close(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
