//! Device configuration — the static, class-agnostic envelope every
//! concrete device class carries regardless of its wire protocol.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::CommandDef;
use crate::error::{GatewayError, ValidationError};
use crate::id::{DeviceId, RoomId};
use crate::state::DeviceState;

/// Control metadata type published on `/devices/{id}/controls/{c}/meta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Switch,
    Range,
    Value,
    Text,
    Pushbutton,
}

/// Explicit override of a control's WB metadata, set via `wb_controls` in
/// the device config. When present for a command, it is used verbatim
/// instead of the inferred type/order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WbControlOverride {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub control_type: ControlType,
    #[serde(default)]
    pub readonly: bool,
    pub order: i32,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub units: Option<String>,
}

/// The class-agnostic envelope every device config carries, plus an opaque
/// JSON bag for the class-specific block (out of the core's scope — see
/// `DeviceDriver`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device_id: DeviceId,
    pub device_name: String,
    pub device_class: String,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default = "default_true")]
    pub virtual_device: bool,
    #[serde(default)]
    pub commands: HashMap<String, CommandDef>,
    #[serde(default)]
    pub wb_controls: HashMap<String, WbControlOverride>,
    #[serde(default)]
    pub wb_state_mappings: HashMap<String, String>,
    #[serde(default)]
    pub extra: Value,
}

fn default_true() -> bool {
    true
}

impl DeviceConfig {
    /// Create a builder for constructing a [`DeviceConfig`].
    #[must_use]
    pub fn builder() -> DeviceConfigBuilder {
        DeviceConfigBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] when `device_id` or
    /// `device_name` is empty.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.device_id.as_str().is_empty() {
            return Err(ValidationError::EmptyDeviceId.into());
        }
        if self.device_name.is_empty() {
            return Err(ValidationError::EmptyDeviceName.into());
        }
        Ok(())
    }

    /// Every command that has a handler is, by invariant, publishable as a
    /// WB control; this returns the commands in declaration order paired
    /// with their name.
    pub fn commands_in_order(&self) -> impl Iterator<Item = (&String, &CommandDef)> {
        self.commands.iter()
    }

    /// Check the WB-publication-specific parts of the config: `wb_controls`
    /// overrides must reference a command this device actually defines and
    /// carry a sane range, and `wb_state_mappings` must point at a known
    /// control. None of these are structural — a device with a bad entry
    /// here still registers and accepts commands, it just skips WB
    /// publication (see `DeviceManager::register_device`).
    #[must_use]
    pub fn validate_wb_config(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (control, over) in &self.wb_controls {
            if !self.commands.contains_key(control) {
                errors.push(ValidationError::WbControlUnknownHandler { control: control.clone() });
            }
            if let (Some(min), Some(max)) = (over.min, over.max) {
                if min >= max {
                    errors.push(ValidationError::WbControlInvalidRange { control: control.clone(), min, max });
                }
            }
        }

        for (field, control) in &self.wb_state_mappings {
            if !self.commands.contains_key(control) && !self.wb_controls.contains_key(control) {
                errors.push(ValidationError::WbStateMappingUnknownControl { field: field.clone(), control: control.clone() });
            }
        }

        errors
    }
}

/// Step-by-step builder for [`DeviceConfig`].
#[derive(Debug, Default)]
pub struct DeviceConfigBuilder {
    device_id: Option<DeviceId>,
    device_name: Option<String>,
    device_class: Option<String>,
    room_id: Option<RoomId>,
    virtual_device: Option<bool>,
    commands: HashMap<String, CommandDef>,
    wb_controls: HashMap<String, WbControlOverride>,
    wb_state_mappings: HashMap<String, String>,
    extra: Option<Value>,
}

impl DeviceConfigBuilder {
    #[must_use]
    pub fn device_id(mut self, id: impl Into<DeviceId>) -> Self {
        self.device_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn device_class(mut self, class: impl Into<String>) -> Self {
        self.device_class = Some(class.into());
        self
    }

    #[must_use]
    pub fn room_id(mut self, room_id: impl Into<RoomId>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    #[must_use]
    pub fn virtual_device(mut self, enabled: bool) -> Self {
        self.virtual_device = Some(enabled);
        self
    }

    #[must_use]
    pub fn command(mut self, name: impl Into<String>, def: CommandDef) -> Self {
        self.commands.insert(name.into(), def);
        self
    }

    #[must_use]
    pub fn wb_control(mut self, name: impl Into<String>, over: WbControlOverride) -> Self {
        self.wb_controls.insert(name.into(), over);
        self
    }

    #[must_use]
    pub fn wb_state_mapping(mut self, state_field: impl Into<String>, control: impl Into<String>) -> Self {
        self.wb_state_mappings.insert(state_field.into(), control.into());
        self
    }

    #[must_use]
    pub fn extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Consume the builder, validate, and return a [`DeviceConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if required fields are missing
    /// or empty.
    pub fn build(self) -> Result<DeviceConfig, GatewayError> {
        let config = DeviceConfig {
            device_id: self.device_id.unwrap_or_else(|| DeviceId::new(String::new())),
            device_name: self.device_name.unwrap_or_default(),
            device_class: self.device_class.unwrap_or_default(),
            room_id: self.room_id,
            virtual_device: self.virtual_device.unwrap_or(true),
            commands: self.commands,
            wb_controls: self.wb_controls,
            wb_state_mappings: self.wb_state_mappings,
            extra: self.extra.unwrap_or(Value::Null),
        };
        config.validate()?;
        Ok(config)
    }
}

/// A device as held by the registry: its static config plus its current
/// runtime state, always kept in lockstep under the same lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub config: DeviceConfig,
    pub state: DeviceState,
}

impl Device {
    /// Build a device whose state starts fresh (unknown power, no errors).
    #[must_use]
    pub fn new(config: DeviceConfig) -> Self {
        let state = DeviceState::new(config.device_id.clone(), config.device_name.clone());
        Self { config, state }
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.config.device_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_valid_config_when_required_fields_provided() {
        let config = DeviceConfig::builder()
            .device_id("tv1")
            .device_name("Living Room TV")
            .device_class("lg_tv")
            .build()
            .unwrap();
        assert_eq!(config.device_id, DeviceId::new("tv1"));
        assert!(config.virtual_device);
    }

    #[test]
    fn should_return_validation_error_when_device_id_is_empty() {
        let result = DeviceConfig::builder().device_name("TV").build();
        assert!(matches!(
            result,
            Err(GatewayError::Validation(ValidationError::EmptyDeviceId))
        ));
    }

    #[test]
    fn should_return_validation_error_when_device_name_is_empty() {
        let result = DeviceConfig::builder().device_id("tv1").build();
        assert!(matches!(
            result,
            Err(GatewayError::Validation(ValidationError::EmptyDeviceName))
        ));
    }

    #[test]
    fn should_accumulate_commands_via_builder() {
        let config = DeviceConfig::builder()
            .device_id("tv1")
            .device_name("TV")
            .device_class("lg_tv")
            .command("power_on", CommandDef {
                action: "power_on".to_string(),
                group: Some("power".to_string()),
                ..CommandDef::default()
            })
            .build()
            .unwrap();
        assert_eq!(config.commands.len(), 1);
        assert!(config.commands.contains_key("power_on"));
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let config = DeviceConfig::builder()
            .device_id("tv1")
            .device_name("TV")
            .device_class("lg_tv")
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: DeviceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.device_id, config.device_id);
        assert_eq!(parsed.device_class, config.device_class);
    }

    #[test]
    fn should_default_virtual_device_to_true_when_absent_from_json() {
        let json = r#"{"device_id":"tv1","device_name":"TV","device_class":"lg_tv"}"#;
        let parsed: DeviceConfig = serde_json::from_str(json).unwrap();
        assert!(parsed.virtual_device);
    }

    #[test]
    fn should_seed_fresh_state_when_device_constructed_from_config() {
        let config = DeviceConfig::builder()
            .device_id("tv1")
            .device_name("TV")
            .device_class("lg_tv")
            .build()
            .unwrap();
        let device = Device::new(config);
        assert_eq!(device.device_id(), &DeviceId::new("tv1"));
        assert_eq!(device.state.device_name, "TV");
    }

    fn sample_override() -> WbControlOverride {
        WbControlOverride {
            title: None,
            control_type: ControlType::Range,
            readonly: false,
            order: 1,
            min: Some(0.0),
            max: Some(100.0),
            units: None,
        }
    }

    #[test]
    fn should_pass_wb_validation_when_overrides_and_mappings_reference_known_commands() {
        let config = DeviceConfig::builder()
            .device_id("tv1")
            .device_name("TV")
            .device_class("lg_tv")
            .command("volume", CommandDef::default())
            .wb_control("volume", sample_override())
            .wb_state_mapping("volume_level", "volume")
            .build()
            .unwrap();
        assert!(config.validate_wb_config().is_empty());
    }

    #[test]
    fn should_flag_wb_control_override_with_no_matching_command() {
        let config = DeviceConfig::builder()
            .device_id("tv1")
            .device_name("TV")
            .device_class("lg_tv")
            .wb_control("volume", sample_override())
            .build()
            .unwrap();
        let errors = config.validate_wb_config();
        assert!(matches!(errors.as_slice(), [ValidationError::WbControlUnknownHandler { control }] if control == "volume"));
    }

    #[test]
    fn should_flag_wb_control_override_with_inverted_range() {
        let mut over = sample_override();
        over.min = Some(100.0);
        over.max = Some(0.0);
        let config = DeviceConfig::builder()
            .device_id("tv1")
            .device_name("TV")
            .device_class("lg_tv")
            .command("volume", CommandDef::default())
            .wb_control("volume", over)
            .build()
            .unwrap();
        let errors = config.validate_wb_config();
        assert!(matches!(errors.as_slice(), [ValidationError::WbControlInvalidRange { control, .. }] if control == "volume"));
    }

    #[test]
    fn should_flag_wb_state_mapping_with_no_matching_control() {
        let config = DeviceConfig::builder()
            .device_id("tv1")
            .device_name("TV")
            .device_class("lg_tv")
            .wb_state_mapping("volume_level", "volume")
            .build()
            .unwrap();
        let errors = config.validate_wb_config();
        assert!(matches!(errors.as_slice(), [ValidationError::WbStateMappingUnknownControl { field, control }] if field == "volume_level" && control == "volume"));
    }
}
