//! Scenario definitions — named, role-addressable bundles of devices with
//! coordinated startup/shutdown sequences.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, ValidationError};
use crate::id::{DeviceId, RoomId, ScenarioId};
use crate::time::Timestamp;

/// Commands this spec's startup sequencer treats as power transitions: a
/// shared device skips these (but nothing else) when a scenario switch
/// leaves it running across the transition.
const POWER_COMMANDS: [&str; 9] = [
    "power_on",
    "power_off",
    "turn_on",
    "turn_off",
    "on",
    "off",
    "standby",
    "wake",
    "power_toggle",
];

/// Whether `name` names a power transition, case-insensitively. Used to
/// decide whether a shared device should skip a startup step rather than be
/// power-cycled across a scenario switch.
#[must_use]
pub fn is_power_command(name: &str) -> bool {
    let lower = name.to_lowercase();
    POWER_COMMANDS.contains(&lower.as_str()) || lower == "power_cycle" || lower == "power-cycle"
}

/// One step of a startup or shutdown sequence: invoke `command` on `device`
/// with `params`, optionally gated by `condition`, then wait `delay_after_ms`
/// before the next step runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandStep {
    pub device: DeviceId,
    pub command: String,
    #[serde(default)]
    pub params: HashMap<String, Value>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub delay_after_ms: u64,
}

/// The static definition of a scenario: which devices it spans, which
/// abstract roles map to which concrete devices, and the ordered steps run
/// on activation and deactivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub scenario_id: ScenarioId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub devices: Vec<DeviceId>,
    #[serde(default)]
    pub roles: HashMap<String, DeviceId>,
    #[serde(default)]
    pub startup_sequence: Vec<CommandStep>,
    #[serde(default)]
    pub shutdown_sequence: Vec<CommandStep>,
}

impl ScenarioDefinition {
    #[must_use]
    pub fn builder() -> ScenarioDefinitionBuilder {
        ScenarioDefinitionBuilder::default()
    }

    /// The device a role resolves to, if the role is defined.
    #[must_use]
    pub fn device_for_role(&self, role: &str) -> Option<&DeviceId> {
        self.roles.get(role)
    }

    /// Referential validation: every role and every step must reference a
    /// device that is actually a member of this scenario.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] on the first referential
    /// violation found.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.scenario_id.as_str().is_empty() {
            return Err(ValidationError::EmptyScenarioId.into());
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyScenarioName.into());
        }
        for (role, device_id) in &self.roles {
            if !self.devices.contains(device_id) {
                return Err(ValidationError::RoleNotInDevices {
                    role: role.clone(),
                    device_id: device_id.to_string(),
                }
                .into());
            }
        }
        for step in self.startup_sequence.iter().chain(&self.shutdown_sequence) {
            if !self.devices.contains(&step.device) {
                return Err(ValidationError::StepDeviceNotInDevices {
                    device_id: step.device.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Fuller validation than [`ScenarioDefinition::validate`], checked
    /// against external context the scenario definition cannot see on its
    /// own: room membership (when `room_id` is set) and whether each step's
    /// command actually exists on its target device. `room_devices` is the
    /// device list of the scenario's `room_id` (absent if the room is
    /// unknown); `commands_of` maps each device id in this scenario to the
    /// command names it actually exposes (absent if the device is
    /// unregistered). Returns every violation found, not just the first.
    #[must_use]
    pub fn validate_context(
        &self,
        room_devices: Option<&[DeviceId]>,
        commands_of: &HashMap<DeviceId, Vec<String>>,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let (Some(room_id), Some(room_devices)) = (&self.room_id, room_devices) {
            for device_id in &self.devices {
                if !room_devices.contains(device_id) {
                    errors.push(ValidationError::DeviceNotInRoom {
                        room_id: room_id.to_string(),
                        device_id: device_id.to_string(),
                    });
                }
            }
        }

        for step in self.startup_sequence.iter().chain(&self.shutdown_sequence) {
            if let Some(available) = commands_of.get(&step.device) {
                if !available.contains(&step.command) {
                    errors.push(ValidationError::StepCommandNotAvailable {
                        device_id: step.device.to_string(),
                        command: step.command.clone(),
                    });
                }
            }
        }

        errors
    }

    /// Devices this scenario shares with `other` — used when switching
    /// scenarios to decide which devices should skip their power-off step.
    #[must_use]
    pub fn shared_devices<'a>(&'a self, other: &'a ScenarioDefinition) -> Vec<&'a DeviceId> {
        self.devices.iter().filter(|d| other.devices.contains(d)).collect()
    }
}

#[derive(Debug, Default)]
pub struct ScenarioDefinitionBuilder {
    scenario_id: Option<ScenarioId>,
    name: Option<String>,
    description: String,
    room_id: Option<RoomId>,
    devices: Vec<DeviceId>,
    roles: HashMap<String, DeviceId>,
    startup_sequence: Vec<CommandStep>,
    shutdown_sequence: Vec<CommandStep>,
}

impl ScenarioDefinitionBuilder {
    #[must_use]
    pub fn scenario_id(mut self, id: impl Into<ScenarioId>) -> Self {
        self.scenario_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn room_id(mut self, id: impl Into<RoomId>) -> Self {
        self.room_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn device(mut self, id: impl Into<DeviceId>) -> Self {
        self.devices.push(id.into());
        self
    }

    #[must_use]
    pub fn role(mut self, role: impl Into<String>, device: impl Into<DeviceId>) -> Self {
        self.roles.insert(role.into(), device.into());
        self
    }

    #[must_use]
    pub fn startup_step(mut self, step: CommandStep) -> Self {
        self.startup_sequence.push(step);
        self
    }

    #[must_use]
    pub fn shutdown_step(mut self, step: CommandStep) -> Self {
        self.shutdown_sequence.push(step);
        self
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if referential invariants do not
    /// hold (see [`ScenarioDefinition::validate`]).
    pub fn build(self) -> Result<ScenarioDefinition, GatewayError> {
        let definition = ScenarioDefinition {
            scenario_id: self.scenario_id.unwrap_or_else(|| ScenarioId::new(String::new())),
            name: self.name.unwrap_or_default(),
            description: self.description,
            room_id: self.room_id,
            devices: self.devices,
            roles: self.roles,
            startup_sequence: self.startup_sequence,
            shutdown_sequence: self.shutdown_sequence,
        };
        definition.validate()?;
        Ok(definition)
    }
}

/// Persisted record of which scenario is active, and since when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioState {
    pub active_scenario: Option<ScenarioId>,
    pub since: Option<Timestamp>,
}

impl ScenarioState {
    #[must_use]
    pub fn none() -> Self {
        Self {
            active_scenario: None,
            since: None,
        }
    }

    #[must_use]
    pub fn activate(scenario_id: ScenarioId, now: Timestamp) -> Self {
        Self {
            active_scenario: Some(scenario_id),
            since: Some(now),
        }
    }

    #[must_use]
    pub fn is_active(&self, scenario_id: &ScenarioId) -> bool {
        self.active_scenario.as_ref() == Some(scenario_id)
    }
}
