//! Common error types used across the workspace.
//!
//! Each layer defines its own concrete error types. The domain layer provides
//! [`ValidationError`], [`NotFoundError`], and [`ScenarioError`]. Adapter
//! layers define their own (e.g. `StorageError` wrapping `sqlx::Error`) and
//! wire them into [`GatewayError`] via `#[from]` conversion.

/// Validation failures raised by domain invariant checks.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("device_id cannot be empty")]
    EmptyDeviceId,
    #[error("device_name cannot be empty")]
    EmptyDeviceName,
    #[error("scenario_id cannot be empty")]
    EmptyScenarioId,
    #[error("scenario name cannot be empty")]
    EmptyScenarioName,
    #[error("room_id cannot be empty")]
    EmptyRoomId,
    #[error("room must have at least one localized name")]
    EmptyRoomNames,
    #[error("role {role:?} maps to device {device_id:?}, which is not in the scenario's device list")]
    RoleNotInDevices { role: String, device_id: String },
    #[error("step for device {device_id:?} references a device not in the scenario's device list")]
    StepDeviceNotInDevices { device_id: String },
    #[error("scenario's room_id {room_id:?} does not contain device {device_id:?}")]
    DeviceNotInRoom { room_id: String, device_id: String },
    #[error("step for device {device_id:?} references unknown command {command:?}")]
    StepCommandNotAvailable { device_id: String, command: String },
    #[error("param {0:?} is required but was not provided")]
    MissingRequiredParam(String),
    #[error("param {name:?} value out of range [{min}, {max}]")]
    ParamOutOfRange { name: String, min: f64, max: f64 },
    #[error("param {name:?} could not be coerced to the expected type: {reason}")]
    ParamCoercion { name: String, reason: String },
    #[error("wb_controls entry {control:?} does not reference a command this device defines")]
    WbControlUnknownHandler { control: String },
    #[error("wb_controls entry {control:?} has an invalid range: min ({min}) must be less than max ({max})")]
    WbControlInvalidRange { control: String, min: f64, max: f64 },
    #[error("wb_state_mappings entry {field:?} -> {control:?} does not reference a known control")]
    WbStateMappingUnknownControl { field: String, control: String },
}

/// Returned when a lookup by identifier finds nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Scenario-specific failures that are always critical (never best-effort).
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("role {0:?} is not defined on this scenario")]
    InvalidRole(String),
    #[error("device {0:?} referenced by the scenario is not registered")]
    MissingDevice(String),
    #[error("no scenario is currently active")]
    NoActiveScenario,
    #[error("scenario {0:?} is unknown")]
    UnknownScenario(String),
    #[error("scenario {0:?} is already active; refusing to start it again")]
    AlreadyActive(String),
    #[error("scenario {expected:?} is not the active scenario (active: {actual:?})")]
    NotActive { expected: String, actual: String },
}

/// Top-level gateway error.
///
/// Adapter crates may introduce additional variants by wrapping their own
/// error types via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("scenario error")]
    Scenario(#[from] ScenarioError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("message bus error")]
    Bus(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience alias used throughout the domain and application layers.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_validation_error_message() {
        let err = ValidationError::EmptyDeviceId;
        assert_eq!(err.to_string(), "device_id cannot be empty");
    }

    #[test]
    fn should_display_not_found_error_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Device",
            id: "tv1".to_string(),
        };
        assert_eq!(err.to_string(), "Device tv1 not found");
    }

    #[test]
    fn should_convert_validation_error_into_gateway_error() {
        let err: GatewayError = ValidationError::EmptyDeviceName.into();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn should_convert_not_found_error_into_gateway_error() {
        let err: GatewayError = NotFoundError {
            entity: "Device",
            id: "xyz".to_string(),
        }
        .into();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[test]
    fn should_convert_scenario_error_into_gateway_error() {
        let err: GatewayError = ScenarioError::NoActiveScenario.into();
        assert!(matches!(err, GatewayError::Scenario(_)));
    }

    #[test]
    fn should_display_wb_control_invalid_range_with_both_bounds() {
        let err = ValidationError::WbControlInvalidRange {
            control: "volume".to_string(),
            min: 100.0,
            max: 0.0,
        };
        assert!(err.to_string().contains("volume"));
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn should_display_scenario_not_active_with_both_ids() {
        let err = ScenarioError::NotActive {
            expected: "reading".to_string(),
            actual: "movie_night".to_string(),
        };
        assert!(err.to_string().contains("reading"));
        assert!(err.to_string().contains("movie_night"));
    }
}
