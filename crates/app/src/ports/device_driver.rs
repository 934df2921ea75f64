//! Device driver port — the abstract contract every concrete device class
//! (LG TV, AppleTV, IR blaster, ...) implements.
//!
//! Concrete drivers live outside this workspace's core scope; only a small
//! demo/virtual driver ships here as a fixture and a template for writing
//! real ones (see `gateway-adapter-virtual`).

use std::future::Future;

use gateway_domain::command::CommandResult;
use gateway_domain::error::GatewayError;
use gateway_domain::state::DeviceState;
use serde_json::Value;

/// Lifecycle and command-handling contract for one device instance.
///
/// Methods mirror the stages the device manager drives a registered device
/// through: connect, subscribe to whatever bus topics it cares about,
/// execute commands, report state, and disconnect.
pub trait DeviceDriver: Send + Sync {
    /// Establish whatever connection or session this device class needs
    /// (open a socket, arm an IR transmitter, ...).
    fn setup(&mut self) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Release resources acquired in [`setup`](Self::setup).
    fn shutdown(&mut self) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Extra bus topics (beyond the device's own WB control topics) this
    /// driver needs delivered to [`handle_message`](Self::handle_message).
    fn subscribe_topics(&self) -> Vec<String>;

    /// Handle an inbound bus message on one of [`subscribe_topics`](Self::subscribe_topics).
    fn handle_message(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Send a raw, class-specific payload to the underlying device, bypassing
    /// the command/parameter abstraction (used for IR/RF passthrough).
    fn send(&mut self, payload: &[u8]) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Execute a named command with already-validated parameters.
    fn execute_action(
        &mut self,
        action: &str,
        params: &std::collections::HashMap<String, Value>,
    ) -> impl Future<Output = Result<CommandResult, GatewayError>> + Send;

    /// Snapshot the driver's current view of device state.
    fn get_current_state(&self) -> impl Future<Output = Result<DeviceState, GatewayError>> + Send;

    /// List the commands this driver instance currently supports (may
    /// differ from the static config when availability is state-dependent).
    fn get_available_commands(&self) -> Vec<String>;
}

/// Object-safe counterpart of [`DeviceDriver`], boxing each future so the
/// device registry can hold a heterogeneous `HashMap<DeviceId, Box<dyn
/// DynDeviceDriver>>` spanning whatever concrete driver types each
/// registered device uses — `impl Future` return types aren't dyn-safe, so
/// this is the seam that makes the registry possible.
pub trait DynDeviceDriver: Send + Sync {
    fn setup<'a>(&'a mut self) -> std::pin::Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>>;

    fn shutdown<'a>(&'a mut self) -> std::pin::Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>>;

    fn subscribe_topics(&self) -> Vec<String>;

    fn handle_message<'a>(
        &'a mut self,
        topic: &'a str,
        payload: &'a [u8],
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>>;

    fn send<'a>(&'a mut self, payload: &'a [u8]) -> std::pin::Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>>;

    fn execute_action<'a>(
        &'a mut self,
        action: &'a str,
        params: &'a std::collections::HashMap<String, Value>,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<CommandResult, GatewayError>> + Send + 'a>>;

    fn get_current_state<'a>(&'a self) -> std::pin::Pin<Box<dyn Future<Output = Result<DeviceState, GatewayError>> + Send + 'a>>;

    fn get_available_commands(&self) -> Vec<String>;
}

impl<T: DeviceDriver> DynDeviceDriver for T {
    fn setup<'a>(&'a mut self) -> std::pin::Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(DeviceDriver::setup(self))
    }

    fn shutdown<'a>(&'a mut self) -> std::pin::Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(DeviceDriver::shutdown(self))
    }

    fn subscribe_topics(&self) -> Vec<String> {
        DeviceDriver::subscribe_topics(self)
    }

    fn handle_message<'a>(
        &'a mut self,
        topic: &'a str,
        payload: &'a [u8],
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(DeviceDriver::handle_message(self, topic, payload))
    }

    fn send<'a>(&'a mut self, payload: &'a [u8]) -> std::pin::Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(DeviceDriver::send(self, payload))
    }

    fn execute_action<'a>(
        &'a mut self,
        action: &'a str,
        params: &'a std::collections::HashMap<String, Value>,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<CommandResult, GatewayError>> + Send + 'a>> {
        Box::pin(DeviceDriver::execute_action(self, action, params))
    }

    fn get_current_state<'a>(&'a self) -> std::pin::Pin<Box<dyn Future<Output = Result<DeviceState, GatewayError>> + Send + 'a>> {
        Box::pin(DeviceDriver::get_current_state(self))
    }

    fn get_available_commands(&self) -> Vec<String> {
        DeviceDriver::get_available_commands(self)
    }
}
