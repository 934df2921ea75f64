//! Runtime device state — the mutable counterpart to [`crate::device::DeviceConfig`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::LastCommand;
use crate::id::DeviceId;
use crate::time::Timestamp;

/// Coarse power state every device class reports, regardless of how many
/// finer-grained fields its class-specific block also carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

impl Default for PowerState {
    fn default() -> Self {
        Self::Unknown
    }
}

/// The live, mutable state of one device.
///
/// Common fields are always present; everything class-specific is kept in
/// `extra` and flattened back out when serialized, so a round-trip through
/// JSON is lossless even though the domain layer never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceState {
    pub device_id: DeviceId,
    pub device_name: String,
    #[serde(default)]
    pub power: PowerState,
    #[serde(default)]
    pub last_command: Option<LastCommand>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl DeviceState {
    /// Build a fresh, powered-off, error-free state for a device.
    #[must_use]
    pub fn new(device_id: DeviceId, device_name: impl Into<String>) -> Self {
        Self {
            device_id,
            device_name: device_name.into(),
            power: PowerState::Unknown,
            last_command: None,
            error: None,
            extra: HashMap::new(),
        }
    }

    /// Record the outcome of a successfully executed command.
    pub fn record_command(&mut self, action: impl Into<String>, source: impl Into<String>, params: HashMap<String, Value>, now: Timestamp) {
        self.last_command = Some(LastCommand {
            action: action.into(),
            source: source.into(),
            timestamp: now,
            params,
        });
        self.error = None;
    }

    /// Record a handler failure without discarding the last good state.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_power(&mut self, power: PowerState) {
        self.power = power;
    }

    /// Read an attribute by name for the condition evaluator: common fields
    /// first, then the class-specific bag.
    #[must_use]
    pub fn get_attr(&self, attr: &str) -> Option<Value> {
        match attr {
            "power" => Some(match self.power {
                PowerState::On => Value::String("on".to_string()),
                PowerState::Off => Value::String("off".to_string()),
                PowerState::Unknown => Value::Null,
            }),
            "error" => self.error.clone().map(Value::String),
            "device_id" => Some(Value::String(self.device_id.to_string())),
            "device_name" => Some(Value::String(self.device_name.clone())),
            other => self.extra.get(other).cloned(),
        }
    }

    /// Flatten this state into a single JSON object, the shape published on
    /// the REST/SSE surface and persisted between restarts.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_start_unknown_power_with_no_error() {
        let state = DeviceState::new(DeviceId::new("tv1"), "TV");
        assert_eq!(state.power, PowerState::Unknown);
        assert!(state.error.is_none());
    }

    #[test]
    fn should_clear_error_when_command_recorded() {
        let mut state = DeviceState::new(DeviceId::new("tv1"), "TV");
        state.record_error("timeout");
        state.record_command("power_on", "mqtt", HashMap::new(), crate::time::now());
        assert!(state.error.is_none());
        assert_eq!(state.last_command.as_ref().unwrap().action, "power_on");
    }

    #[test]
    fn should_read_power_attr_through_get_attr() {
        let mut state = DeviceState::new(DeviceId::new("tv1"), "TV");
        state.set_power(PowerState::On);
        assert_eq!(state.get_attr("power"), Some(json!("on")));
    }

    #[test]
    fn should_read_class_specific_attr_from_extra_bag() {
        let mut state = DeviceState::new(DeviceId::new("tv1"), "TV");
        state.extra.insert("input".to_string(), json!("hdmi1"));
        assert_eq!(state.get_attr("input"), Some(json!("hdmi1")));
    }

    #[test]
    fn should_return_none_for_unknown_attr() {
        let state = DeviceState::new(DeviceId::new("tv1"), "TV");
        assert_eq!(state.get_attr("nonexistent"), None);
    }

    #[test]
    fn should_roundtrip_losslessly_with_flattened_extras() {
        let mut state = DeviceState::new(DeviceId::new("tv1"), "TV");
        state.extra.insert("volume".to_string(), json!(20));
        let json = serde_json::to_string(&state).unwrap();
        let parsed: DeviceState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.extra.get("volume"), Some(&json!(20)));
    }
}
