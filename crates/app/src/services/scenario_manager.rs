//! Scenario manager — loads scenario definitions, switches between them with
//! minimal disruption to devices shared across the transition, and routes
//! role-addressed commands to the currently active scenario.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use gateway_domain::command::CommandResult;
use gateway_domain::condition;
use gateway_domain::error::{GatewayError, ScenarioError};
use gateway_domain::event::{Channel, Event, EventType};
use gateway_domain::id::{DeviceId, RoomId, ScenarioId};
use gateway_domain::room::Room;
use gateway_domain::scenario::{is_power_command, ScenarioDefinition, ScenarioState};

use crate::ports::{EventPublisher, MessageBusPort, StateRepository};
use crate::services::device_manager::DeviceManager;

/// Outcome of a [`ScenarioManager::switch_scenario`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwitchResult {
    pub shared_devices: Vec<DeviceId>,
    pub power_cycled_devices: Vec<DeviceId>,
}

/// Holds every known scenario definition, tracks which one (if any) is
/// active, and serialises transitions so only one switch runs at a time.
pub struct ScenarioManager<S, B, P> {
    repo: Arc<S>,
    device_manager: Arc<DeviceManager<S, B, P>>,
    publisher: Arc<P>,
    definitions: Mutex<HashMap<ScenarioId, ScenarioDefinition>>,
    current: Mutex<Option<ScenarioId>>,
    switch_lock: Mutex<()>,
}

impl<S, B, P> ScenarioManager<S, B, P>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(repo: S, device_manager: Arc<DeviceManager<S, B, P>>, publisher: P) -> Self {
        Self {
            repo: Arc::new(repo),
            device_manager,
            publisher: Arc::new(publisher),
            definitions: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            switch_lock: Mutex::new(()),
        }
    }

    /// Validate and register a batch of scenario definitions. Invalid
    /// definitions are logged and skipped rather than aborting the whole
    /// batch — one malformed scenario file shouldn't take down the rest.
    ///
    /// Referential validation ([`ScenarioDefinition::validate`]) is fatal
    /// for the file. Context validation against `rooms` and the devices
    /// already registered on the device manager
    /// ([`ScenarioDefinition::validate_context`]) is logged but not fatal:
    /// a scenario referencing a not-yet-registered device, or a device not
    /// (yet) listed in its room, is common at boot order and should not
    /// prevent the scenario from loading.
    pub async fn load_scenarios(&self, candidates: Vec<ScenarioDefinition>, rooms: &HashMap<RoomId, Room>) {
        let commands_of: HashMap<DeviceId, Vec<String>> = self
            .device_manager
            .list_configs()
            .await
            .into_iter()
            .map(|config| (config.device_id.clone(), config.commands.keys().cloned().collect()))
            .collect();

        let mut definitions = self.definitions.lock().await;
        for definition in candidates {
            if let Err(err) = definition.validate() {
                tracing::warn!(scenario_id = %definition.scenario_id, error = %err, "skipping invalid scenario definition");
                continue;
            }

            let room_devices = definition
                .room_id
                .as_ref()
                .and_then(|id| rooms.get(id))
                .map(|room| room.devices.as_slice());
            for err in definition.validate_context(room_devices, &commands_of) {
                tracing::warn!(scenario_id = %definition.scenario_id, error = %err, "scenario context validation issue");
            }

            definitions.insert(definition.scenario_id.clone(), definition);
        }
    }

    /// Restore the previously active scenario (if any, and if still known)
    /// from the repository.
    ///
    /// # Errors
    ///
    /// Returns whatever the repository's `load_scenario_state` returns.
    pub async fn initialize(&self) -> Result<(), GatewayError> {
        let state = self.repo.load_scenario_state().await?;
        if let Some(id) = state.active_scenario {
            if self.definitions.lock().await.contains_key(&id) {
                self.switch_scenario(&id, true).await?;
            } else {
                tracing::warn!(scenario_id = %id, "persisted active scenario is no longer defined");
            }
        }
        Ok(())
    }

    #[must_use]
    pub async fn current_scenario(&self) -> Option<ScenarioId> {
        self.current.lock().await.clone()
    }

    /// The persisted scenario state (active scenario id and activation
    /// timestamp, if any).
    ///
    /// # Errors
    ///
    /// Returns whatever the repository's `load_scenario_state` returns.
    pub async fn scenario_state(&self) -> Result<ScenarioState, GatewayError> {
        self.repo.load_scenario_state().await
    }

    #[must_use]
    pub async fn definition(&self, id: &ScenarioId) -> Option<ScenarioDefinition> {
        self.definitions.lock().await.get(id).cloned()
    }

    #[must_use]
    pub async fn list_definitions(&self) -> Vec<ScenarioDefinition> {
        self.definitions.lock().await.values().cloned().collect()
    }

    /// The device manager backing this scenario manager, for callers (such
    /// as the WB adapter) that need to read device configs or registry
    /// state directly.
    #[must_use]
    pub fn device_manager(&self) -> &Arc<DeviceManager<S, B, P>> {
        &self.device_manager
    }

    /// Run `id`'s startup sequence directly, independent of
    /// [`ScenarioManager::switch_scenario`] — used by the WB adapter's
    /// `startup` pushbutton.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::UnknownScenario`] if `id` is not defined.
    pub async fn run_startup_sequence(&self, id: &ScenarioId) -> Result<(), GatewayError> {
        let definition = self
            .definitions
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ScenarioError::UnknownScenario(id.to_string()))?;
        self.run_sequence(&definition, &definition.startup_sequence, &[]).await;
        Ok(())
    }

    /// Run `id`'s shutdown sequence directly, independent of
    /// [`ScenarioManager::switch_scenario`] — used by the WB adapter's
    /// `shutdown` pushbutton.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::UnknownScenario`] if `id` is not defined.
    pub async fn run_shutdown_sequence(&self, id: &ScenarioId) -> Result<(), GatewayError> {
        let definition = self
            .definitions
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ScenarioError::UnknownScenario(id.to_string()))?;
        self.run_sequence(&definition, &definition.shutdown_sequence, &[]).await;
        Ok(())
    }

    /// Switch to `target_id`. A no-op (empty result) if it is already
    /// active. With `graceful = true`, devices shared between the outgoing
    /// and incoming scenario are left running rather than power-cycled.
    /// With `graceful = false`, the outgoing scenario's full shutdown
    /// sequence runs regardless of overlap.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Scenario`] if `target_id` is unknown, or
    /// whatever the repository returns while persisting the new active
    /// scenario.
    pub async fn switch_scenario(&self, target_id: &ScenarioId, graceful: bool) -> Result<SwitchResult, GatewayError> {
        let _exclusive = self.switch_lock.lock().await;

        let current_id = self.current.lock().await.clone();
        if current_id.as_ref() == Some(target_id) {
            return Ok(SwitchResult::default());
        }

        let target = self
            .definitions
            .lock()
            .await
            .get(target_id)
            .cloned()
            .ok_or_else(|| ScenarioError::UnknownScenario(target_id.to_string()))?;

        let current_def = match &current_id {
            Some(id) => self.definitions.lock().await.get(id).cloned(),
            None => None,
        };

        let shared: Vec<DeviceId> = match (&current_def, graceful) {
            (Some(current), true) => current.shared_devices(&target).into_iter().cloned().collect(),
            _ => Vec::new(),
        };

        let mut power_cycled = Vec::new();
        if let Some(current) = &current_def {
            if graceful {
                for device_id in &current.devices {
                    if shared.contains(device_id) {
                        continue;
                    }
                    match self.device_manager.execute_action(device_id, "power_off", &HashMap::new(), "scenario").await {
                        Ok(_) => power_cycled.push(device_id.clone()),
                        Err(err) => tracing::warn!(%device_id, error = %err, "failed to power off device leaving scenario"),
                    }
                }
            } else {
                self.run_sequence(current, &current.shutdown_sequence, &[]).await;
            }
        }

        self.run_sequence(&target, &target.startup_sequence, &shared).await;

        *self.current.lock().await = Some(target_id.clone());
        let now = gateway_domain::time::now();
        self.repo.save_scenario_state(&ScenarioState::activate(target_id.clone(), now)).await?;
        self.publisher
            .publish(Event::new(
                Channel::Scenarios,
                EventType::ScenarioActivated,
                Some(target_id.to_string()),
                serde_json::json!({
                    "shared_devices": shared,
                    "power_cycled_devices": power_cycled,
                }),
            ))
            .await?;

        Ok(SwitchResult {
            shared_devices: shared,
            power_cycled_devices: power_cycled,
        })
    }

    /// Run `sequence`'s steps in order: skip power steps for devices in
    /// `skip_power_for`, evaluate each condition, tolerate any failure and
    /// keep going, sleep `delay_after_ms` between steps.
    async fn run_sequence(
        &self,
        definition: &ScenarioDefinition,
        sequence: &[gateway_domain::scenario::CommandStep],
        skip_power_for: &[DeviceId],
    ) {
        for step in sequence {
            if self.device_manager.get_state(&step.device).await.is_err() {
                tracing::warn!(scenario_id = %definition.scenario_id, device_id = %step.device, "sequence step references unregistered device, skipping");
                continue;
            }
            if skip_power_for.contains(&step.device) && is_power_command(&step.command) {
                continue;
            }
            if let Some(condition_text) = &step.condition {
                if !self.evaluate_condition(condition_text).await {
                    continue;
                }
            }
            if let Err(err) = self
                .device_manager
                .execute_action(&step.device, &step.command, &step.params, "scenario")
                .await
            {
                tracing::warn!(
                    scenario_id = %definition.scenario_id,
                    device_id = %step.device,
                    command = %step.command,
                    error = %err,
                    "scenario sequence step failed, continuing"
                );
            }
            if step.delay_after_ms > 0 {
                tokio::time::sleep(Duration::from_millis(step.delay_after_ms)).await;
            }
        }
    }

    /// Parse and evaluate a condition string against live device state.
    /// Malformed text is permissive (`true`); a referenced device or
    /// attribute that cannot be resolved evaluates to `false`.
    async fn evaluate_condition(&self, text: &str) -> bool {
        let parsed = match condition::parse(text) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(condition = text, error = %err, "malformed scenario condition, treating as true");
                return true;
            }
        };
        let value = self
            .device_manager
            .get_state(&DeviceId::new(parsed.device_id.clone()))
            .await
            .ok()
            .and_then(|state| state.get_attr(&parsed.attr));
        match value {
            Some(resolved) => condition::evaluate(&parsed, |_, _| Some(resolved)),
            None => false,
        }
    }

    /// Delegate a role-addressed command to the named scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::UnknownScenario`] if `scenario_id` is not
    /// defined, [`ScenarioError::InvalidRole`] if `role` is not defined on
    /// it, [`ScenarioError::MissingDevice`] if the role's device is not
    /// registered, or whatever the device driver itself returns.
    pub async fn execute_role_action(
        &self,
        scenario_id: &ScenarioId,
        role: &str,
        command: &str,
        params: &HashMap<String, Value>,
    ) -> Result<CommandResult, GatewayError> {
        let definition = self
            .definitions
            .lock()
            .await
            .get(scenario_id)
            .cloned()
            .ok_or_else(|| ScenarioError::UnknownScenario(scenario_id.to_string()))?;
        let device_id = definition
            .device_for_role(role)
            .cloned()
            .ok_or_else(|| ScenarioError::InvalidRole(role.to_string()))?;

        match self.device_manager.execute_action(&device_id, command, params, "role_action").await {
            Err(GatewayError::NotFound(_)) => Err(ScenarioError::MissingDevice(device_id.to_string()).into()),
            other => other,
        }
    }

    /// Delegate a role-addressed command to the currently active scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::NoActiveScenario`] if no scenario is active.
    pub async fn execute_current_role_action(
        &self,
        role: &str,
        command: &str,
        params: &HashMap<String, Value>,
    ) -> Result<CommandResult, GatewayError> {
        let current = self.current.lock().await.clone().ok_or(ScenarioError::NoActiveScenario)?;
        self.execute_role_action(&current, role, command, params).await
    }

    /// Activate `id` as a fresh scenario. Refuses if any scenario is
    /// already active — use [`ScenarioManager::switch_scenario`] to move
    /// between scenarios instead.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::AlreadyActive`] if a scenario is already
    /// running.
    pub async fn start_scenario(&self, id: &ScenarioId) -> Result<SwitchResult, GatewayError> {
        if let Some(active) = self.current.lock().await.clone() {
            return Err(ScenarioError::AlreadyActive(active.to_string()).into());
        }
        self.switch_scenario(id, true).await
    }

    /// Deactivate `id`, which must be the currently active scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::NotActive`] if `id` is not the active
    /// scenario.
    pub async fn shutdown_scenario(&self, id: &ScenarioId, graceful: bool) -> Result<(), GatewayError> {
        let _exclusive = self.switch_lock.lock().await;
        let current = self.current.lock().await.clone();
        if current.as_ref() != Some(id) {
            return Err(ScenarioError::NotActive {
                expected: id.to_string(),
                actual: current.map_or_else(String::new, |c| c.to_string()),
            }
            .into());
        }
        drop(current);
        self.deactivate_current(graceful).await
    }

    async fn deactivate_current(&self, graceful: bool) -> Result<(), GatewayError> {
        let current_id = self.current.lock().await.clone();
        let Some(current_id) = current_id else {
            return Ok(());
        };
        let Some(definition) = self.definitions.lock().await.get(&current_id).cloned() else {
            *self.current.lock().await = None;
            return self.repo.save_scenario_state(&ScenarioState::none()).await;
        };

        if graceful {
            for device_id in &definition.devices {
                if let Err(err) = self.device_manager.execute_action(device_id, "power_off", &HashMap::new(), "scenario").await {
                    tracing::warn!(%device_id, error = %err, "failed to power off device during scenario deactivation");
                }
            }
        } else {
            self.run_sequence(&definition, &definition.shutdown_sequence, &[]).await;
        }

        *self.current.lock().await = None;
        self.repo.save_scenario_state(&ScenarioState::none()).await?;
        self.publisher
            .publish(Event::new(
                Channel::Scenarios,
                EventType::ScenarioDeactivated,
                Some(current_id.to_string()),
                serde_json::json!({}),
            ))
            .await
    }

    /// Process-level shutdown: best-effort run the active scenario's
    /// shutdown sequence and clear the active-scenario record.
    ///
    /// # Errors
    ///
    /// Returns whatever the repository returns while clearing state.
    pub async fn shutdown(&self) -> Result<(), GatewayError> {
        let current_id = self.current.lock().await.clone();
        if let Some(id) = current_id {
            if let Some(definition) = self.definitions.lock().await.get(&id).cloned() {
                self.run_sequence(&definition, &definition.shutdown_sequence, &[]).await;
            }
        }
        *self.current.lock().await = None;
        self.repo.save_scenario_state(&ScenarioState::none()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_domain::command::{CommandDef, CommandResult as DomainCommandResult};
    use gateway_domain::device::DeviceConfig;
    use gateway_domain::maintenance::MaintenanceGuard;
    use gateway_domain::scenario::CommandStep;
    use gateway_domain::state::DeviceState;
    use std::future::Future;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct InMemoryRepo {
        devices: StdMutex<HashMap<DeviceId, DeviceState>>,
        scenario: StdMutex<Option<ScenarioState>>,
    }

    impl StateRepository for InMemoryRepo {
        fn save_device_state(&self, state: &DeviceState) -> impl Future<Output = Result<(), GatewayError>> + Send {
            self.devices.lock().unwrap().insert(state.device_id.clone(), state.clone());
            async { Ok(()) }
        }
        fn load_device_state(&self, device_id: &DeviceId) -> impl Future<Output = Result<Option<DeviceState>, GatewayError>> + Send {
            let r = self.devices.lock().unwrap().get(device_id).cloned();
            async { Ok(r) }
        }
        fn load_all_device_states(&self) -> impl Future<Output = Result<Vec<DeviceState>, GatewayError>> + Send {
            let r: Vec<_> = self.devices.lock().unwrap().values().cloned().collect();
            async { Ok(r) }
        }
        fn save_scenario_state(&self, state: &ScenarioState) -> impl Future<Output = Result<(), GatewayError>> + Send {
            *self.scenario.lock().unwrap() = Some(state.clone());
            async { Ok(()) }
        }
        fn load_scenario_state(&self) -> impl Future<Output = Result<ScenarioState, GatewayError>> + Send {
            let r = self.scenario.lock().unwrap().clone().unwrap_or_else(ScenarioState::none);
            async { Ok(r) }
        }
        fn close(&self) -> impl Future<Output = Result<(), GatewayError>> + Send {
            async { Ok(()) }
        }
    }

    #[derive(Default)]
    struct InMemoryBus;

    impl MessageBusPort for InMemoryBus {
        fn publish(&self, _topic: &str, _payload: Vec<u8>, _retain: bool) -> impl Future<Output = Result<(), GatewayError>> + Send {
            async { Ok(()) }
        }
        fn subscribe(&self, _topic_filter: &str) -> impl Future<Output = Result<(), GatewayError>> + Send {
            async { Ok(()) }
        }
        fn add_will_message(&self, _device_id: &DeviceId, _topic: &str, _payload: Vec<u8>, _retain: bool) -> impl Future<Output = Result<(), GatewayError>> + Send {
            async { Ok(()) }
        }
        fn remove_device_will_messages(&self, _device_id: &DeviceId) -> impl Future<Output = Result<(), GatewayError>> + Send {
            async { Ok(()) }
        }
    }

    #[derive(Default)]
    struct SpyPublisher {
        events: StdMutex<Vec<Event>>,
    }

    impl EventPublisher for SpyPublisher {
        fn publish(&self, event: Event) -> impl Future<Output = Result<(), GatewayError>> + Send {
            self.events.lock().unwrap().push(event);
            async { Ok(()) }
        }
    }

    struct RecordingDriver {
        calls: Arc<StdMutex<Vec<String>>>,
        power: bool,
    }

    impl crate::ports::DeviceDriver for RecordingDriver {
        fn setup(&mut self) -> impl Future<Output = Result<(), GatewayError>> + Send {
            async { Ok(()) }
        }
        fn shutdown(&mut self) -> impl Future<Output = Result<(), GatewayError>> + Send {
            async { Ok(()) }
        }
        fn subscribe_topics(&self) -> Vec<String> {
            vec![]
        }
        fn handle_message(&mut self, _topic: &str, _payload: &[u8]) -> impl Future<Output = Result<(), GatewayError>> + Send {
            async { Ok(()) }
        }
        fn send(&mut self, _payload: &[u8]) -> impl Future<Output = Result<(), GatewayError>> + Send {
            async { Ok(()) }
        }
        fn execute_action(
            &mut self,
            action: &str,
            _params: &HashMap<String, Value>,
        ) -> impl Future<Output = Result<DomainCommandResult, GatewayError>> + Send {
            self.calls.lock().unwrap().push(action.to_string());
            self.power = action == "power_on";
            async { Ok(DomainCommandResult::ok()) }
        }
        fn get_current_state(&self) -> impl Future<Output = Result<DeviceState, GatewayError>> + Send {
            let mut state = DeviceState::new(DeviceId::new("placeholder"), "placeholder");
            state.set_power(if self.power {
                gateway_domain::state::PowerState::On
            } else {
                gateway_domain::state::PowerState::Off
            });
            async { Ok(state) }
        }
        fn get_available_commands(&self) -> Vec<String> {
            vec!["power_on".to_string(), "power_off".to_string()]
        }
    }

    fn device_config(id: &str, name: &str) -> DeviceConfig {
        DeviceConfig::builder()
            .device_id(id)
            .device_name(name)
            .device_class("stub")
            .command("power_on", CommandDef {
                action: "power_on".to_string(),
                group: Some("power".to_string()),
                ..CommandDef::default()
            })
            .command("power_off", CommandDef {
                action: "power_off".to_string(),
                group: Some("power".to_string()),
                ..CommandDef::default()
            })
            .build()
            .unwrap()
    }

    async fn make_manager() -> (
        Arc<DeviceManager<InMemoryRepo, InMemoryBus, SpyPublisher>>,
        ScenarioManager<InMemoryRepo, InMemoryBus, SpyPublisher>,
        HashMap<&'static str, Arc<StdMutex<Vec<String>>>>,
    ) {
        let device_manager = Arc::new(DeviceManager::new(
            InMemoryRepo::default(),
            InMemoryBus,
            SpyPublisher::default(),
            MaintenanceGuard::default(),
        ));

        let mut calls = HashMap::new();
        for (id, name) in [("tv1", "TV"), ("soundbar1", "Soundbar"), ("lights1", "Lights")] {
            let log = Arc::new(StdMutex::new(Vec::new()));
            calls.insert(id, Arc::clone(&log));
            device_manager
                .register_device(device_config(id, name), Box::new(RecordingDriver { calls: log, power: false }))
                .await
                .unwrap();
        }

        let scenario_manager = ScenarioManager::new(InMemoryRepo::default(), Arc::clone(&device_manager), SpyPublisher::default());
        (device_manager, scenario_manager, calls)
    }

    fn movie_night() -> ScenarioDefinition {
        ScenarioDefinition::builder()
            .scenario_id("movie_night")
            .name("Movie Night")
            .device(DeviceId::new("tv1"))
            .device(DeviceId::new("soundbar1"))
            .device(DeviceId::new("lights1"))
            .role("display", DeviceId::new("tv1"))
            .startup_step(CommandStep {
                device: DeviceId::new("tv1"),
                command: "power_on".to_string(),
                params: HashMap::new(),
                condition: None,
                delay_after_ms: 0,
            })
            .startup_step(CommandStep {
                device: DeviceId::new("soundbar1"),
                command: "power_on".to_string(),
                params: HashMap::new(),
                condition: None,
                delay_after_ms: 0,
            })
            .build()
            .unwrap()
    }

    fn reading() -> ScenarioDefinition {
        ScenarioDefinition::builder()
            .scenario_id("reading")
            .name("Reading")
            .device(DeviceId::new("tv1"))
            .device(DeviceId::new("lights1"))
            .startup_step(CommandStep {
                device: DeviceId::new("tv1"),
                command: "power_on".to_string(),
                params: HashMap::new(),
                condition: None,
                delay_after_ms: 0,
            })
            .startup_step(CommandStep {
                device: DeviceId::new("lights1"),
                command: "power_on".to_string(),
                params: HashMap::new(),
                condition: None,
                delay_after_ms: 0,
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_switch_scenario_and_skip_power_for_shared_devices() {
        let (_dm, sm, calls) = make_manager().await;
        sm.load_scenarios(vec![movie_night(), reading()], &HashMap::new()).await;

        sm.switch_scenario(&ScenarioId::new("movie_night"), true).await.unwrap();
        let result = sm.switch_scenario(&ScenarioId::new("reading"), true).await.unwrap();

        let mut shared = result.shared_devices.clone();
        shared.sort();
        assert_eq!(shared, vec![DeviceId::new("lights1"), DeviceId::new("tv1")]);
        assert_eq!(result.power_cycled_devices, vec![DeviceId::new("soundbar1")]);

        // tv1 and lights1 are shared; the startup sequence must not
        // re-invoke their power_on (no additional calls beyond the first
        // activation's single power_on each).
        assert_eq!(calls["tv1"].lock().unwrap().iter().filter(|c| *c == "power_on").count(), 1);
        assert_eq!(calls["soundbar1"].lock().unwrap().as_slice(), &["power_on", "power_off"]);
    }

    #[tokio::test]
    async fn should_be_idempotent_when_switching_to_already_active_scenario() {
        let (_dm, sm, _calls) = make_manager().await;
        sm.load_scenarios(vec![movie_night()], &HashMap::new()).await;
        sm.switch_scenario(&ScenarioId::new("movie_night"), true).await.unwrap();

        let result = sm.switch_scenario(&ScenarioId::new("movie_night"), true).await.unwrap();
        assert_eq!(result, SwitchResult::default());
    }

    #[tokio::test]
    async fn should_reject_switch_to_unknown_scenario() {
        let (_dm, sm, _calls) = make_manager().await;
        let result = sm.switch_scenario(&ScenarioId::new("nonexistent"), true).await;
        assert!(matches!(result, Err(GatewayError::Scenario(ScenarioError::UnknownScenario(_)))));
    }

    #[tokio::test]
    async fn should_delegate_role_action_to_current_scenario() {
        let (_dm, sm, calls) = make_manager().await;
        sm.load_scenarios(vec![movie_night()], &HashMap::new()).await;
        sm.switch_scenario(&ScenarioId::new("movie_night"), true).await.unwrap();

        sm.execute_current_role_action("display", "power_off", &HashMap::new()).await.unwrap();
        assert!(calls["tv1"].lock().unwrap().contains(&"power_off".to_string()));
    }

    #[tokio::test]
    async fn should_fail_role_action_when_no_scenario_active() {
        let (_dm, sm, _calls) = make_manager().await;
        let result = sm.execute_current_role_action("display", "power_off", &HashMap::new()).await;
        assert!(matches!(result, Err(GatewayError::Scenario(ScenarioError::NoActiveScenario))));
    }

    #[tokio::test]
    async fn should_fail_role_action_for_unknown_role() {
        let (_dm, sm, _calls) = make_manager().await;
        sm.load_scenarios(vec![movie_night()], &HashMap::new()).await;
        sm.switch_scenario(&ScenarioId::new("movie_night"), true).await.unwrap();

        let result = sm.execute_current_role_action("input", "power_off", &HashMap::new()).await;
        assert!(matches!(result, Err(GatewayError::Scenario(ScenarioError::InvalidRole(_)))));
    }

    #[tokio::test]
    async fn should_refuse_start_when_scenario_already_active() {
        let (_dm, sm, _calls) = make_manager().await;
        sm.load_scenarios(vec![movie_night(), reading()], &HashMap::new()).await;
        sm.start_scenario(&ScenarioId::new("movie_night")).await.unwrap();

        let result = sm.start_scenario(&ScenarioId::new("reading")).await;
        assert!(matches!(result, Err(GatewayError::Scenario(ScenarioError::AlreadyActive(_)))));
    }

    #[tokio::test]
    async fn should_refuse_shutdown_of_non_active_scenario() {
        let (_dm, sm, _calls) = make_manager().await;
        sm.load_scenarios(vec![movie_night(), reading()], &HashMap::new()).await;
        sm.switch_scenario(&ScenarioId::new("movie_night"), true).await.unwrap();

        let result = sm.shutdown_scenario(&ScenarioId::new("reading"), true).await;
        assert!(matches!(result, Err(GatewayError::Scenario(ScenarioError::NotActive { .. }))));
    }

    #[tokio::test]
    async fn should_skip_condition_gated_step_when_condition_is_false() {
        let (_dm, sm, calls) = make_manager().await;
        let gated = ScenarioDefinition::builder()
            .scenario_id("gated")
            .name("Gated")
            .device(DeviceId::new("soundbar1"))
            .startup_step(CommandStep {
                device: DeviceId::new("soundbar1"),
                command: "power_on".to_string(),
                params: HashMap::new(),
                condition: Some(r#"soundbar1.power != "off""#.to_string()),
                delay_after_ms: 0,
            })
            .build()
            .unwrap();
        sm.load_scenarios(vec![gated], &HashMap::new()).await;

        sm.switch_scenario(&ScenarioId::new("gated"), true).await.unwrap();
        assert!(calls["soundbar1"].lock().unwrap().is_empty());
    }
}
