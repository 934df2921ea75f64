//! Command definitions, parameter validation, and command results.
//!
//! A [`CommandDef`] is the static description of one action a device
//! supports (`power_on`, `set_volume`, ...). [`resolve_and_validate`] turns
//! a raw, loosely-typed payload (from MQTT or REST) into a strongly typed
//! parameter map, or a [`ValidationError`] naming the offending parameter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// The accepted shape of a single command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    Range,
}

/// Declares one parameter a command accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Extra fields carried only by IR-backed commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IrCommandExtra {
    pub location: Option<String>,
    pub rom_position: Option<u32>,
}

/// Static description of one action a device exposes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandDef {
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamDef>,
    #[serde(default, flatten)]
    pub ir: IrCommandExtra,
}

/// The last successfully executed command, recorded on device state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastCommand {
    pub action: String,
    pub source: String,
    pub timestamp: crate::time::Timestamp,
    pub params: HashMap<String, Value>,
}

/// Outcome of invoking a single command handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub mqtt_command: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl CommandResult {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// REST-facing response to `POST /devices/{id}/action`.
pub type CommandResponse = CommandResult;

/// Coerce and validate a raw parameter payload against its `ParamDef`s.
///
/// # Errors
///
/// Returns [`ValidationError::MissingRequiredParam`] when a required
/// parameter is absent, [`ValidationError::ParamOutOfRange`] when a `range`
/// value falls outside `[min, max]`, or [`ValidationError::ParamCoercion`]
/// when a value cannot be coerced to its declared type.
pub fn resolve_and_validate(
    defs: &[ParamDef],
    provided: &HashMap<String, Value>,
) -> Result<HashMap<String, Value>, ValidationError> {
    let mut resolved = HashMap::with_capacity(defs.len());
    for def in defs {
        let raw = provided.get(&def.name);
        let value = match raw {
            Some(v) => coerce(def, v)?,
            None => match &def.default {
                Some(default) => default.clone(),
                None => {
                    if def.required {
                        return Err(ValidationError::MissingRequiredParam(def.name.clone()));
                    }
                    continue;
                }
            },
        };
        if matches!(def.param_type, ParamType::Range) {
            if let Some(n) = value.as_f64() {
                let min = def.min.unwrap_or(f64::NEG_INFINITY);
                let max = def.max.unwrap_or(f64::INFINITY);
                if n < min || n > max {
                    return Err(ValidationError::ParamOutOfRange {
                        name: def.name.clone(),
                        min,
                        max,
                    });
                }
            }
        }
        resolved.insert(def.name.clone(), value);
    }
    Ok(resolved)
}

fn coerce(def: &ParamDef, raw: &Value) -> Result<Value, ValidationError> {
    match def.param_type {
        ParamType::String => Ok(Value::String(as_string(raw))),
        ParamType::Boolean => Ok(Value::Bool(as_bool(raw).ok_or_else(|| {
            ValidationError::ParamCoercion {
                name: def.name.clone(),
                reason: format!("{raw} is not a recognised boolean"),
            }
        })?)),
        ParamType::Integer => as_f64(raw)
            .map(|n| Value::from(n as i64))
            .ok_or_else(|| ValidationError::ParamCoercion {
                name: def.name.clone(),
                reason: format!("{raw} is not an integer"),
            }),
        ParamType::Float | ParamType::Range => as_f64(raw).map(|n| {
            serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
        }).ok_or_else(|| ValidationError::ParamCoercion {
            name: def.name.clone(),
            reason: format!("{raw} is not a number"),
        }),
    }
}

/// Parse a raw inbound MQTT control payload (`/controls/{c}/on`) per a
/// parameter's declared type. This is the forgiving counterpart to
/// [`coerce`]: a boolean parses the same accepted tokens, a string passes
/// through untouched, but a numeric value that fails to parse falls back to
/// the parameter's `default` rather than rejecting the command outright — a
/// stray non-numeric payload on the wire should leave the control at a sane
/// value, not refuse to act on it. Returns `None` only when parsing fails
/// and no default is configured, meaning the payload should be dropped.
#[must_use]
pub fn parse_inbound_payload(def: &ParamDef, raw: &str) -> Option<Value> {
    match def.param_type {
        ParamType::Boolean => Some(Value::Bool(as_bool(&Value::String(raw.to_string())).unwrap_or(false))),
        ParamType::String => Some(Value::String(raw.to_string())),
        ParamType::Integer => raw
            .parse::<f64>()
            .ok()
            .map(|n| Value::from(n as i64))
            .or_else(|| def.default.clone()),
        ParamType::Float | ParamType::Range => raw
            .parse::<f64>()
            .ok()
            .map(|n| serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number))
            .or_else(|| def.default.clone()),
    }
}

fn as_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(true),
            "0" | "false" | "off" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn level_param() -> ParamDef {
        ParamDef {
            name: "level".to_string(),
            param_type: ParamType::Range,
            required: true,
            default: Some(json!(50)),
            min: Some(0.0),
            max: Some(100.0),
            description: None,
        }
    }

    #[test]
    fn should_accept_value_at_min_boundary() {
        let mut provided = HashMap::new();
        provided.insert("level".to_string(), json!(0));
        let resolved = resolve_and_validate(&[level_param()], &provided).unwrap();
        assert_eq!(resolved["level"], json!(0.0));
    }

    #[test]
    fn should_accept_value_at_max_boundary() {
        let mut provided = HashMap::new();
        provided.insert("level".to_string(), json!(100));
        let resolved = resolve_and_validate(&[level_param()], &provided).unwrap();
        assert_eq!(resolved["level"], json!(100.0));
    }

    #[test]
    fn should_reject_value_above_max() {
        let mut provided = HashMap::new();
        provided.insert("level".to_string(), json!(150));
        let result = resolve_and_validate(&[level_param()], &provided);
        assert!(matches!(
            result,
            Err(ValidationError::ParamOutOfRange { .. })
        ));
    }

    #[test]
    fn should_reject_value_below_min() {
        let mut provided = HashMap::new();
        provided.insert("level".to_string(), json!(-1));
        let result = resolve_and_validate(&[level_param()], &provided);
        assert!(matches!(
            result,
            Err(ValidationError::ParamOutOfRange { .. })
        ));
    }

    #[test]
    fn should_use_default_when_optional_param_missing() {
        let mut def = level_param();
        def.required = false;
        let resolved = resolve_and_validate(&[def], &HashMap::new()).unwrap();
        assert_eq!(resolved["level"], json!(50.0));
    }

    #[test]
    fn should_fail_when_required_param_missing_and_no_default() {
        let def = ParamDef {
            default: None,
            ..level_param()
        };
        let result = resolve_and_validate(&[def], &HashMap::new());
        assert!(matches!(
            result,
            Err(ValidationError::MissingRequiredParam(_))
        ));
    }

    #[test]
    fn should_coerce_string_digit_to_boolean() {
        let def = ParamDef {
            name: "mute".to_string(),
            param_type: ParamType::Boolean,
            required: true,
            default: None,
            min: None,
            max: None,
            description: None,
        };
        let mut provided = HashMap::new();
        provided.insert("mute".to_string(), json!("1"));
        let resolved = resolve_and_validate(&[def], &provided).unwrap();
        assert_eq!(resolved["mute"], json!(true));
    }

    #[test]
    fn should_coerce_numeric_string_to_float() {
        let mut provided = HashMap::new();
        provided.insert("level".to_string(), json!("42.5"));
        let resolved = resolve_and_validate(&[level_param()], &provided).unwrap();
        assert_eq!(resolved["level"], json!(42.5));
    }

    #[test]
    fn should_produce_keys_exactly_matching_present_or_defaulted_params() {
        let defs = vec![
            level_param(),
            ParamDef {
                name: "optional_no_default".to_string(),
                param_type: ParamType::String,
                required: false,
                default: None,
                min: None,
                max: None,
                description: None,
            },
        ];
        let mut provided = HashMap::new();
        provided.insert("level".to_string(), json!(10));
        let resolved = resolve_and_validate(&defs, &provided).unwrap();
        let keys: std::collections::BTreeSet<_> = resolved.keys().cloned().collect();
        assert_eq!(
            keys,
            std::collections::BTreeSet::from(["level".to_string()])
        );
    }

    #[test]
    fn should_parse_inbound_boolean_tokens() {
        assert_eq!(
            parse_inbound_payload(
                &ParamDef {
                    name: "enabled".to_string(),
                    param_type: ParamType::Boolean,
                    required: true,
                    default: None,
                    min: None,
                    max: None,
                    description: None,
                },
                "on"
            ),
            Some(json!(true))
        );
    }

    #[test]
    fn should_fall_back_to_default_when_inbound_numeric_payload_unparseable() {
        let resolved = parse_inbound_payload(&level_param(), "not-a-number");
        assert_eq!(resolved, Some(json!(50)));
    }

    #[test]
    fn should_parse_inbound_numeric_payload_when_well_formed() {
        let resolved = parse_inbound_payload(&level_param(), "75");
        assert_eq!(resolved, Some(json!(75)));
    }

    #[test]
    fn should_pass_through_inbound_string_payload_untouched() {
        let def = ParamDef {
            name: "label".to_string(),
            param_type: ParamType::String,
            required: false,
            default: None,
            min: None,
            max: None,
            description: None,
        };
        assert_eq!(parse_inbound_payload(&def, "HDMI 1"), Some(json!("HDMI 1")));
    }

    #[test]
    fn should_build_success_result_via_constructor() {
        let result = CommandResult::ok_with_message("done");
        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some("done"));
    }

    #[test]
    fn should_build_failure_result_via_constructor() {
        let result = CommandResult::failure("bad param");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("bad param"));
    }
}
