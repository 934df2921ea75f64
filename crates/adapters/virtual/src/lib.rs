//! # gateway-adapter-virtual
//!
//! A small in-process demo [`DeviceDriver`] standing in for a real AV
//! receiver: power, volume, mute, and input selection, all held in memory.
//! Ships as a fixture for integration tests and as a template for writing a
//! real driver (LG WebOS, Apple TV, Emotiva XMC2, Broadlink RF, ...) — those
//! concrete classes are out of this workspace's scope.
//!
//! ## Dependency rule
//!
//! Depends on `gateway-app` (the `DeviceDriver` port) and `gateway-domain`
//! only.

use std::collections::HashMap;
use std::future::Future;

use serde_json::Value;

use gateway_app::ports::DeviceDriver;
use gateway_domain::command::CommandResult;
use gateway_domain::error::GatewayError;
use gateway_domain::id::DeviceId;
use gateway_domain::state::{DeviceState, PowerState};

const INPUTS: &[&str] = &["hdmi1", "hdmi2", "optical", "bluetooth"];

/// In-memory state simulated by [`VirtualAvDriver`].
#[derive(Debug, Clone)]
struct SimulatedState {
    power: PowerState,
    volume: i64,
    muted: bool,
    input: String,
}

impl Default for SimulatedState {
    fn default() -> Self {
        Self {
            power: PowerState::Off,
            volume: 20,
            muted: false,
            input: INPUTS[0].to_string(),
        }
    }
}

/// Demo driver simulating a generic AV receiver. Supports `power_on`,
/// `power_off`, `set_volume` (range 0-100), `set_mute` (boolean), and
/// `set_input` (one of [`INPUTS`]).
pub struct VirtualAvDriver {
    device_id: DeviceId,
    device_name: String,
    state: SimulatedState,
}

impl VirtualAvDriver {
    #[must_use]
    pub fn new(device_id: DeviceId, device_name: impl Into<String>) -> Self {
        Self {
            device_id,
            device_name: device_name.into(),
            state: SimulatedState::default(),
        }
    }

    fn snapshot(&self) -> DeviceState {
        let mut state = DeviceState::new(self.device_id.clone(), self.device_name.clone());
        state.set_power(self.state.power);
        state.extra.insert("volume".to_string(), Value::from(self.state.volume));
        state.extra.insert("muted".to_string(), Value::from(self.state.muted));
        state.extra.insert("input".to_string(), Value::from(self.state.input.clone()));
        state
    }
}

impl DeviceDriver for VirtualAvDriver {
    fn setup(&mut self) -> impl Future<Output = Result<(), GatewayError>> + Send {
        async { Ok(()) }
    }

    fn shutdown(&mut self) -> impl Future<Output = Result<(), GatewayError>> + Send {
        self.state.power = PowerState::Off;
        async { Ok(()) }
    }

    fn subscribe_topics(&self) -> Vec<String> {
        Vec::new()
    }

    fn handle_message(&mut self, _topic: &str, _payload: &[u8]) -> impl Future<Output = Result<(), GatewayError>> + Send {
        async { Ok(()) }
    }

    fn send(&mut self, _payload: &[u8]) -> impl Future<Output = Result<(), GatewayError>> + Send {
        async { Ok(()) }
    }

    fn execute_action(
        &mut self,
        action: &str,
        params: &HashMap<String, Value>,
    ) -> impl Future<Output = Result<CommandResult, GatewayError>> + Send {
        let result = match action {
            "power_on" => {
                self.state.power = PowerState::On;
                CommandResult::ok()
            }
            "power_off" => {
                self.state.power = PowerState::Off;
                CommandResult::ok()
            }
            "set_volume" => match params.get("level").and_then(Value::as_i64) {
                Some(level) => {
                    self.state.volume = level;
                    CommandResult::ok()
                }
                None => CommandResult::failure("set_volume requires a `level` parameter"),
            },
            "set_mute" => match params.get("muted").and_then(Value::as_bool) {
                Some(muted) => {
                    self.state.muted = muted;
                    CommandResult::ok()
                }
                None => CommandResult::failure("set_mute requires a `muted` parameter"),
            },
            "set_input" => match params.get("input").and_then(Value::as_str) {
                Some(input) if INPUTS.contains(&input) => {
                    self.state.input = input.to_string();
                    CommandResult::ok()
                }
                Some(other) => CommandResult::failure(format!("unknown input {other:?}")),
                None => CommandResult::failure("set_input requires an `input` parameter"),
            },
            other => CommandResult::failure(format!("unrecognised command {other:?}")),
        };
        async move { Ok(result) }
    }

    fn get_current_state(&self) -> impl Future<Output = Result<DeviceState, GatewayError>> + Send {
        let state = self.snapshot();
        async move { Ok(state) }
    }

    fn get_available_commands(&self) -> Vec<String> {
        vec![
            "power_on".to_string(),
            "power_off".to_string(),
            "set_volume".to_string(),
            "set_mute".to_string(),
            "set_input".to_string(),
        ]
    }
}

/// Build the [`gateway_domain::device::DeviceConfig`] this driver is meant
/// to be registered under: a WB-visible AV receiver with power, volume,
/// mute, and input controls.
#[must_use]
pub fn demo_device_config(device_id: impl Into<String>, device_name: impl Into<String>) -> gateway_domain::device::DeviceConfig {
    use gateway_domain::command::{CommandDef, ParamDef, ParamType};

    gateway_domain::device::DeviceConfig::builder()
        .device_id(device_id)
        .device_name(device_name)
        .device_class("virtual_av")
        .command(
            "power_on",
            CommandDef {
                action: "power_on".to_string(),
                group: Some("power".to_string()),
                description: Some("Turn the device on".to_string()),
                ..CommandDef::default()
            },
        )
        .command(
            "power_off",
            CommandDef {
                action: "power_off".to_string(),
                group: Some("power".to_string()),
                description: Some("Turn the device off".to_string()),
                ..CommandDef::default()
            },
        )
        .command(
            "set_volume",
            CommandDef {
                action: "set_volume".to_string(),
                group: Some("volume".to_string()),
                description: Some("Set the volume level".to_string()),
                params: vec![ParamDef {
                    name: "level".to_string(),
                    param_type: ParamType::Range,
                    required: true,
                    default: Some(Value::from(20)),
                    min: Some(0.0),
                    max: Some(100.0),
                    description: None,
                }],
                ..CommandDef::default()
            },
        )
        .command(
            "set_mute",
            CommandDef {
                action: "set_mute".to_string(),
                group: Some("volume".to_string()),
                description: Some("Mute or unmute".to_string()),
                params: vec![ParamDef {
                    name: "muted".to_string(),
                    param_type: ParamType::Boolean,
                    required: true,
                    default: Some(Value::from(false)),
                    min: None,
                    max: None,
                    description: None,
                }],
                ..CommandDef::default()
            },
        )
        .command(
            "set_input",
            CommandDef {
                action: "set_input".to_string(),
                group: Some("inputs".to_string()),
                description: Some("Select an input".to_string()),
                params: vec![ParamDef {
                    name: "input".to_string(),
                    param_type: ParamType::String,
                    required: true,
                    default: Some(Value::from(INPUTS[0])),
                    min: None,
                    max: None,
                    description: None,
                }],
                ..CommandDef::default()
            },
        )
        .build()
        .expect("demo device config always has a non-empty id and name")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_report_power_off_by_default() {
        let driver = VirtualAvDriver::new(DeviceId::new("demo"), "Demo AV");
        let state = driver.get_current_state().await.unwrap();
        assert_eq!(state.power, PowerState::Off);
    }

    #[tokio::test]
    async fn should_turn_on_and_reflect_power_state() {
        let mut driver = VirtualAvDriver::new(DeviceId::new("demo"), "Demo AV");
        let result = driver.execute_action("power_on", &HashMap::new()).await.unwrap();
        assert!(result.success);
        let state = driver.get_current_state().await.unwrap();
        assert_eq!(state.power, PowerState::On);
    }

    #[tokio::test]
    async fn should_set_volume_within_range() {
        let mut driver = VirtualAvDriver::new(DeviceId::new("demo"), "Demo AV");
        let mut params = HashMap::new();
        params.insert("level".to_string(), Value::from(65));
        let result = driver.execute_action("set_volume", &params).await.unwrap();
        assert!(result.success);
        let state = driver.get_current_state().await.unwrap();
        assert_eq!(state.extra.get("volume"), Some(&Value::from(65)));
    }

    #[tokio::test]
    async fn should_reject_unknown_input() {
        let mut driver = VirtualAvDriver::new(DeviceId::new("demo"), "Demo AV");
        let mut params = HashMap::new();
        params.insert("input".to_string(), Value::from("vga"));
        let result = driver.execute_action("set_input", &params).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn should_select_known_input() {
        let mut driver = VirtualAvDriver::new(DeviceId::new("demo"), "Demo AV");
        let mut params = HashMap::new();
        params.insert("input".to_string(), Value::from("hdmi2"));
        let result = driver.execute_action("set_input", &params).await.unwrap();
        assert!(result.success);
        let state = driver.get_current_state().await.unwrap();
        assert_eq!(state.extra.get("input"), Some(&Value::from("hdmi2")));
    }

    #[tokio::test]
    async fn should_turn_off_on_shutdown() {
        let mut driver = VirtualAvDriver::new(DeviceId::new("demo"), "Demo AV");
        driver.execute_action("power_on", &HashMap::new()).await.unwrap();
        driver.shutdown().await.unwrap();
        let state = driver.get_current_state().await.unwrap();
        assert_eq!(state.power, PowerState::Off);
    }

    #[test]
    fn should_build_demo_device_config_with_all_commands() {
        let config = demo_device_config("demo", "Demo AV");
        assert!(config.commands.contains_key("power_on"));
        assert!(config.commands.contains_key("set_volume"));
        assert!(config.commands.contains_key("set_input"));
    }
}
