//! Rooms group devices for display purposes only — they carry no behaviour
//! of their own and are never referenced by scenario logic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, ValidationError};
use crate::id::{DeviceId, RoomId, ScenarioId};

/// A named grouping of devices, with optional per-locale display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomId,
    pub names: HashMap<String, String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub devices: Vec<DeviceId>,
    #[serde(default)]
    pub default_scenario: Option<ScenarioId>,
}

impl Room {
    #[must_use]
    pub fn builder() -> RoomBuilder {
        RoomBuilder::default()
    }

    /// The display name for `locale`, falling back to any other name if the
    /// requested locale was not configured.
    #[must_use]
    pub fn display_name(&self, locale: &str) -> Option<&str> {
        self.names
            .get(locale)
            .or_else(|| self.names.values().next())
            .map(String::as_str)
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] when `room_id` is empty or no
    /// display name was configured.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.room_id.as_str().is_empty() {
            return Err(ValidationError::EmptyRoomId.into());
        }
        if self.names.is_empty() {
            return Err(ValidationError::EmptyRoomNames.into());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RoomBuilder {
    room_id: Option<RoomId>,
    names: HashMap<String, String>,
    description: String,
    devices: Vec<DeviceId>,
    default_scenario: Option<ScenarioId>,
}

impl RoomBuilder {
    #[must_use]
    pub fn room_id(mut self, id: impl Into<RoomId>) -> Self {
        self.room_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, locale: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(locale.into(), name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn device(mut self, id: impl Into<DeviceId>) -> Self {
        self.devices.push(id.into());
        self
    }

    #[must_use]
    pub fn default_scenario(mut self, id: impl Into<ScenarioId>) -> Self {
        self.default_scenario = Some(id.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if required fields are missing.
    pub fn build(self) -> Result<Room, GatewayError> {
        let room = Room {
            room_id: self.room_id.unwrap_or_else(|| RoomId::new(String::new())),
            names: self.names,
            description: self.description,
            devices: self.devices,
            default_scenario: self.default_scenario,
        };
        room.validate()?;
        Ok(room)
    }
}
