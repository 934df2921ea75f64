//! Control type and display-order inference.
//!
//! When a device config does not supply an explicit [`crate::device::WbControlOverride`]
//! for a command, the WB adapter falls back to inferring a reasonable
//! control type and sort order from the command's name and parameters. The
//! numeric tiers below are load-bearing: several installed panel layouts
//! depend on commands sorting the same way across restarts, so the scheme
//! is fixed rather than alphabetic.

use crate::command::{CommandDef, ParamType};
use crate::device::ControlType;

/// `group` → base tier. Unlisted groups fall into the last tier.
fn group_order(group: Option<&str>) -> i32 {
    match group.unwrap_or_default() {
        "power" => 1,
        "inputs" => 2,
        "playback" => 3,
        "volume" => 4,
        "menu" => 5,
        "navigation" => 6,
        "display" => 7,
        _ => 10,
    }
}

/// Substring match against the command's action name, used to order
/// commands within the same group consistently (power on before power off,
/// play before pause before stop, and so on).
fn action_offset(action: &str) -> i32 {
    const ACTION_ORDER: &[(&str, i32)] = &[
        ("on", 1),
        ("off", 2),
        ("play", 3),
        ("pause", 4),
        ("stop", 5),
        ("mute", 6),
        ("unmute", 7),
        ("set_volume", 8),
        ("set_level", 9),
    ];
    for (needle, offset) in ACTION_ORDER {
        if action.contains(needle) {
            return *offset;
        }
    }
    50
}

/// Infer the sort order a command's control should publish with when no
/// explicit override is configured.
///
/// `base = group_tier * 100`, plus an offset from matching the action name
/// against a fixed substring table (first match wins, default `50`).
#[must_use]
pub fn infer_order(def: &CommandDef) -> i32 {
    group_order(def.group.as_deref()) * 100 + action_offset(&def.action)
}

/// Infer the WB control type from a command's parameter shape and group,
/// in the order the WB adapter falls back through when no explicit
/// `wb_controls` override is configured:
///
/// - if `params` is non-empty, the *first* parameter's type decides:
///   `range`/`integer`/`float` → `range`; `boolean` → `switch`; `string` →
///   `text` (regardless of how many more parameters follow);
/// - else, if `group` is known, a fixed group/action table applies
///   (`power`/`playback`/`navigation`/`menu` → `pushbutton`; `volume` +
///   `set_*` → `range`; `volume` + `mute*`/`unmute*` → `switch`;
///   `inputs`/`apps` + an explicit setter → `text`);
/// - otherwise → `pushbutton`.
#[must_use]
pub fn infer_control_type(def: &CommandDef) -> ControlType {
    if let Some(first) = def.params.first() {
        return match first.param_type {
            ParamType::Range | ParamType::Integer | ParamType::Float => ControlType::Range,
            ParamType::Boolean => ControlType::Switch,
            ParamType::String => ControlType::Text,
        };
    }
    infer_control_type_from_group(def)
}

/// Rule 3: zero-param commands fall back to a group/action table.
fn infer_control_type_from_group(def: &CommandDef) -> ControlType {
    match def.group.as_deref().unwrap_or_default() {
        "power" | "playback" | "navigation" | "menu" => ControlType::Pushbutton,
        "volume" => {
            if def.action.starts_with("set_") {
                ControlType::Range
            } else if def.action.contains("mute") || def.action.contains("unmute") {
                ControlType::Switch
            } else {
                ControlType::Pushbutton
            }
        }
        "inputs" | "apps" if def.action.starts_with("set_") => ControlType::Text,
        _ => ControlType::Pushbutton,
    }
}
