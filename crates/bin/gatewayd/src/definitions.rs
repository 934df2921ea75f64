//! Loading device, scenario, and room definitions from disk.
//!
//! Devices and scenarios are one JSON file each under their respective
//! directory; rooms are a single `rooms.json` mapping `room_id` to room
//! definition. Missing directories are treated as empty rather than an
//! error, so a minimal deployment can start with no devices configured yet.

use std::collections::HashMap;
use std::path::Path;

use gateway_domain::device::DeviceConfig;
use gateway_domain::id::RoomId;
use gateway_domain::room::Room;
use gateway_domain::scenario::ScenarioDefinition;

fn read_json_dir<T: serde::de::DeserializeOwned>(dir: &str) -> anyhow::Result<Vec<T>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(dir, "definitions directory not found, treating as empty");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let mut items = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(std::ffi::OsStr::to_str) != Some("json") {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(item) => items.push(item),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "skipping malformed definition file"),
        }
    }
    Ok(items)
}

pub fn load_device_configs(dir: &str) -> anyhow::Result<Vec<DeviceConfig>> {
    read_json_dir(dir)
}

pub fn load_scenario_definitions(dir: &str) -> anyhow::Result<Vec<ScenarioDefinition>> {
    read_json_dir(dir)
}

/// Load `rooms.json`, a map of `room_id -> Room`. An absent file yields no
/// rooms rather than an error.
pub fn load_rooms(path: &str) -> anyhow::Result<HashMap<RoomId, Room>> {
    if !Path::new(path).exists() {
        tracing::info!(path, "rooms file not found, starting with no rooms");
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    let rooms: HashMap<RoomId, Room> = serde_json::from_str(&content)?;
    Ok(rooms)
}
