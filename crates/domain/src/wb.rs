//! Wiren Board virtual-device MQTT topic protocol.
//!
//! Every device (and the synthetic scenario device, see `ScenarioWbAdapter`
//! in the app layer) is published under `/devices/{id}/...` following the
//! conventions WB-compatible controllers and dashboards already understand.
//! All topics are retained except the inbound `.../on` command topic.

use serde::{Deserialize, Serialize};

use crate::command::CommandDef;
use crate::device::{ControlType, WbControlOverride};
use crate::order::{infer_control_type, infer_order};

/// `/devices/{device_id}/meta`
#[must_use]
pub fn device_meta_topic(device_id: &str) -> String {
    format!("/devices/{device_id}/meta")
}

/// `/devices/{device_id}/meta/available`
#[must_use]
pub fn device_available_topic(device_id: &str) -> String {
    format!("/devices/{device_id}/meta/available")
}

/// `/devices/{device_id}/meta/error`
#[must_use]
pub fn device_error_topic(device_id: &str) -> String {
    format!("/devices/{device_id}/meta/error")
}

/// `/devices/{device_id}/controls/{control}/meta`
#[must_use]
pub fn control_meta_topic(device_id: &str, control: &str) -> String {
    format!("/devices/{device_id}/controls/{control}/meta")
}

/// `/devices/{device_id}/controls/{control}` — the retained current value.
#[must_use]
pub fn control_value_topic(device_id: &str, control: &str) -> String {
    format!("/devices/{device_id}/controls/{control}")
}

/// `/devices/{device_id}/controls/{control}/on` — the inbound command topic.
/// Unlike every other topic in this module, messages here are not retained.
#[must_use]
pub fn control_command_topic(device_id: &str, control: &str) -> String {
    format!("/devices/{device_id}/controls/{control}/on")
}

/// The JSON body published to a control's `/meta` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMeta {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub control_type: ControlType,
    pub readonly: bool,
    pub order: i32,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub units: Option<String>,
}

impl ControlMeta {
    /// Build control metadata for a command, preferring an explicit override
    /// and otherwise inferring type and order from the command definition.
    #[must_use]
    pub fn for_command(name: &str, def: &CommandDef, override_: Option<&WbControlOverride>) -> Self {
        if let Some(over) = override_ {
            return Self {
                title: over.title.clone().or_else(|| Some(name.to_string())),
                control_type: over.control_type,
                readonly: over.readonly,
                order: over.order,
                min: over.min,
                max: over.max,
                units: over.units.clone(),
            };
        }
        let control_type = infer_control_type(def);
        let (min, max) = def
            .params
            .first()
            .map_or((None, None), |p| (p.min, p.max));
        Self {
            title: def.description.clone().or_else(|| Some(name.to_string())),
            control_type,
            readonly: false,
            order: infer_order(def),
            min,
            max,
            units: None,
        }
    }
}
