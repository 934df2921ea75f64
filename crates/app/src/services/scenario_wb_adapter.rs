//! Scenario WB adapter — projects each known scenario as a synthetic
//! virtual device on the same WB publication machinery real devices use
//! (§4.E), so a scenario's `startup`/`shutdown` pushbuttons and its
//! role-derived controls are reachable over MQTT exactly like any other
//! device's commands.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use gateway_domain::command::{CommandDef, CommandResult};
use gateway_domain::device::DeviceConfig;
use gateway_domain::error::GatewayError;
use gateway_domain::id::{DeviceId, ScenarioId};
use gateway_domain::scenario::ScenarioDefinition;
use gateway_domain::state::{DeviceState, PowerState};

use crate::ports::{DeviceDriver, EventPublisher, MessageBusPort, StateRepository};
use crate::services::device_manager::DeviceManager;
use crate::services::scenario_manager::ScenarioManager;

/// Roles whose devices are addressed structurally (e.g. input switching is
/// handled by the target device directly) and so never get a role-derived
/// command namespace of their own.
const STRUCTURAL_ROLES: &[&str] = &["inputs"];

/// Which command groups a role's target device contributes commands from.
fn role_groups(role: &str) -> &'static [&'static str] {
    match role {
        "playback" => &["playback"],
        "volume" => &["volume"],
        "menu" => &["menu", "navigation"],
        "display" => &["screen", "display"],
        _ => &[],
    }
}

/// Build the synthetic [`DeviceConfig`] for one scenario: `startup`/
/// `shutdown` pushbuttons, plus `{role}_{command}` commands copied from
/// each role's target device for every command whose group matches that
/// role's mapping.
#[must_use]
pub fn build_virtual_config(definition: &ScenarioDefinition, device_configs: &[DeviceConfig]) -> DeviceConfig {
    let mut builder = DeviceConfig::builder()
        .device_id(definition.scenario_id.as_str())
        .device_name(definition.name.clone())
        .device_class("Scenario")
        .command(
            "startup",
            CommandDef {
                action: "startup".to_string(),
                group: Some("power".to_string()),
                description: Some("Run this scenario's startup sequence".to_string()),
                ..CommandDef::default()
            },
        )
        .command(
            "shutdown",
            CommandDef {
                action: "shutdown".to_string(),
                group: Some("power".to_string()),
                description: Some("Run this scenario's shutdown sequence".to_string()),
                ..CommandDef::default()
            },
        );

    let mut roles: Vec<_> = definition.roles.iter().collect();
    roles.sort_by_key(|(role, _)| (*role).clone());
    for (role, device_id) in roles {
        if STRUCTURAL_ROLES.contains(&role.as_str()) {
            continue;
        }
        let groups = role_groups(role);
        if groups.is_empty() {
            continue;
        }
        let Some(target) = device_configs.iter().find(|c| &c.device_id == device_id) else {
            continue;
        };
        let mut commands: Vec<_> = target.commands.iter().collect();
        commands.sort_by_key(|(name, _)| (*name).clone());
        for (name, def) in commands {
            let Some(group) = &def.group else { continue };
            if !groups.contains(&group.as_str()) {
                continue;
            }
            builder = builder.command(format!("{role}_{name}"), def.clone());
        }
    }

    builder.build().expect("synthetic scenario device config always has non-empty id and name")
}

/// Register one synthetic WB device per known scenario definition. Each
/// device's commands are resolved against the currently registered devices
/// at call time, so this should run after every real device has been
/// registered.
///
/// # Errors
///
/// Returns whatever [`DeviceManager::register_device`] returns.
pub async fn register_all<S, B, P>(
    device_manager: &Arc<DeviceManager<S, B, P>>,
    scenario_manager: &Arc<ScenarioManager<S, B, P>>,
) -> Result<(), GatewayError>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
    P: EventPublisher + 'static,
{
    let device_configs = device_manager.list_configs().await;
    for definition in scenario_manager.list_definitions().await {
        let config = build_virtual_config(&definition, &device_configs);
        let driver = ScenarioWbDriver::new(definition.scenario_id.clone(), definition.name.clone(), Arc::clone(scenario_manager));
        device_manager.register_device(config, Box::new(driver)).await?;
    }
    Ok(())
}

/// The driver behind each scenario's synthetic virtual device. Routes
/// inbound WB commands to the scenario manager; only the scenario matching
/// the currently active one actually executes anything.
pub struct ScenarioWbDriver<S, B, P> {
    scenario_id: ScenarioId,
    scenario_name: String,
    scenario_manager: Arc<ScenarioManager<S, B, P>>,
}

impl<S, B, P> ScenarioWbDriver<S, B, P> {
    #[must_use]
    pub fn new(scenario_id: ScenarioId, scenario_name: String, scenario_manager: Arc<ScenarioManager<S, B, P>>) -> Self {
        Self {
            scenario_id,
            scenario_name,
            scenario_manager,
        }
    }
}

impl<S, B, P> DeviceDriver for ScenarioWbDriver<S, B, P>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
    P: EventPublisher + 'static,
{
    fn setup(&mut self) -> impl Future<Output = Result<(), GatewayError>> + Send {
        async { Ok(()) }
    }

    fn shutdown(&mut self) -> impl Future<Output = Result<(), GatewayError>> + Send {
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

    fn execute_action(&mut self, action: &str, params: &HashMap<String, Value>) -> impl Future<Output = Result<CommandResult, GatewayError>> + Send {
        let scenario_id = self.scenario_id.clone();
        let action = action.to_string();
        let params = params.clone();
        let scenario_manager = Arc::clone(&self.scenario_manager);
        async move {
            let is_current = scenario_manager.current_scenario().await.as_ref() == Some(&scenario_id);
            if !is_current {
                tracing::debug!(scenario_id = %scenario_id, action = %action, "ignoring command on inactive scenario");
                return Ok(CommandResult::failure(format!("scenario {scenario_id} is not active")));
            }
            match action.as_str() {
                "startup" => {
                    scenario_manager.run_startup_sequence(&scenario_id).await?;
                    Ok(CommandResult::ok())
                }
                "shutdown" => {
                    scenario_manager.run_shutdown_sequence(&scenario_id).await?;
                    Ok(CommandResult::ok())
                }
                other => match other.split_once('_') {
                    Some((role, command)) => scenario_manager.execute_role_action(&scenario_id, role, command, &params).await,
                    None => Ok(CommandResult::failure(format!("unrecognised scenario command {other:?}"))),
                },
            }
        }
    }

    fn get_current_state(&self) -> impl Future<Output = Result<DeviceState, GatewayError>> + Send {
        let scenario_id = self.scenario_id.clone();
        let scenario_name = self.scenario_name.clone();
        let scenario_manager = Arc::clone(&self.scenario_manager);
        async move {
            let is_current = scenario_manager.current_scenario().await.as_ref() == Some(&scenario_id);
            let mut state = DeviceState::new(DeviceId::new(scenario_id.into_inner()), scenario_name);
            state.set_power(if is_current { PowerState::On } else { PowerState::Off });
            Ok(state)
        }
    }

    fn get_available_commands(&self) -> Vec<String> {
        vec!["startup".to_string(), "shutdown".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_domain::command::ParamDef;

    fn tv_config() -> DeviceConfig {
        DeviceConfig::builder()
            .device_id("tv1")
            .device_name("TV")
            .device_class("stub")
            .command(
                "set_volume",
                CommandDef {
                    action: "set_volume".to_string(),
                    group: Some("volume".to_string()),
                    params: vec![ParamDef {
                        name: "level".to_string(),
                        param_type: gateway_domain::command::ParamType::Range,
                        required: true,
                        default: None,
                        min: Some(0.0),
                        max: Some(100.0),
                        description: None,
                    }],
                    ..CommandDef::default()
                },
            )
            .command(
                "input_hdmi1",
                CommandDef {
                    action: "input_hdmi1".to_string(),
                    group: Some("inputs".to_string()),
                    ..CommandDef::default()
                },
            )
            .build()
            .unwrap()
    }

    fn movie_night() -> ScenarioDefinition {
        ScenarioDefinition::builder()
            .scenario_id("movie_night")
            .name("Movie Night")
            .device(DeviceId::new("tv1"))
            .role("volume", DeviceId::new("tv1"))
            .role("inputs", DeviceId::new("tv1"))
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_virtual_config_with_startup_and_shutdown() {
        let config = build_virtual_config(&movie_night(), &[tv_config()]);
        assert!(config.commands.contains_key("startup"));
        assert!(config.commands.contains_key("shutdown"));
    }

    #[test]
    fn should_copy_role_derived_commands_by_group() {
        let config = build_virtual_config(&movie_night(), &[tv_config()]);
        assert!(config.commands.contains_key("volume_set_volume"));
    }

    #[test]
    fn should_skip_structural_roles() {
        let config = build_virtual_config(&movie_night(), &[tv_config()]);
        assert!(!config.commands.values().any(|c| c.action == "input_hdmi1"));
    }

    #[test]
    fn should_skip_role_whose_target_device_is_unknown() {
        let orphaned = ScenarioDefinition::builder()
            .scenario_id("s")
            .name("S")
            .device(DeviceId::new("missing"))
            .role("volume", DeviceId::new("missing"))
            .build()
            .unwrap();
        let config = build_virtual_config(&orphaned, &[]);
        assert_eq!(config.commands.len(), 2);
    }
}
