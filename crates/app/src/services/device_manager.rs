//! Device manager — the registry of live devices and the command pipeline
//! that validates, dispatches, persists, and publishes every action.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use gateway_domain::command::{resolve_and_validate, CommandResult};
use gateway_domain::device::DeviceConfig;
use gateway_domain::error::{GatewayError, NotFoundError};
use gateway_domain::event::{Channel, Event, EventType};
use gateway_domain::id::DeviceId;
use gateway_domain::maintenance::MaintenanceGuard;
use gateway_domain::state::DeviceState;
use gateway_domain::wb::{self, ControlMeta};

use crate::ports::device_driver::DynDeviceDriver;
use crate::ports::{EventPublisher, MessageBusPort, StateRepository};

struct RegisteredDevice {
    config: DeviceConfig,
    state: Mutex<DeviceState>,
    driver: Mutex<Box<dyn DynDeviceDriver>>,
    /// `false` when the device's `wb_controls`/`wb_state_mappings` failed
    /// validation at registration time. Such a device still accepts
    /// commands and is persisted/broadcast normally — it just never
    /// touches a WB topic.
    wb_enabled: bool,
}

/// Owns every registered device, dispatches commands to its driver, and
/// keeps its WB topics, persisted state, and SSE events in sync.
///
/// Persistence after a successful command runs in the background during
/// normal operation so it never delays the caller's response; once
/// [`DeviceManager::prepare_for_shutdown`] has been called, writes happen
/// inline so the shutdown sequence can wait for them deterministically.
pub struct DeviceManager<S, B, P> {
    repo: Arc<S>,
    bus: Arc<B>,
    publisher: Arc<P>,
    devices: Mutex<HashMap<DeviceId, Arc<RegisteredDevice>>>,
    maintenance: Mutex<MaintenanceGuard>,
    shutting_down: AtomicBool,
    persistence_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S, B, P> DeviceManager<S, B, P>
where
    S: StateRepository + 'static,
    B: MessageBusPort + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(repo: S, bus: B, publisher: P, maintenance: MaintenanceGuard) -> Self {
        Self {
            repo: Arc::new(repo),
            bus: Arc::new(bus),
            publisher: Arc::new(publisher),
            devices: Mutex::new(HashMap::new()),
            maintenance: Mutex::new(maintenance),
            shutting_down: AtomicBool::new(false),
            persistence_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Register a device: validate its config, seed or restore its state,
    /// start its driver, register its last-will message, subscribe its
    /// topics, and publish WB metadata.
    #[tracing::instrument(skip(self, config, driver), fields(device_id = %config.device_id))]
    pub async fn register_device(
        &self,
        config: DeviceConfig,
        mut driver: Box<dyn DynDeviceDriver>,
    ) -> Result<(), GatewayError> {
        config.validate()?;
        let device_id = config.device_id.clone();

        driver.setup().await?;

        let state = self
            .repo
            .load_device_state(&device_id)
            .await?
            .unwrap_or_else(|| DeviceState::new(device_id.clone(), config.device_name.clone()));

        self.bus
            .add_will_message(&device_id, &wb::device_available_topic(device_id.as_str()), b"0".to_vec(), true)
            .await?;

        self.bus
            .subscribe(&wb::control_command_topic(device_id.as_str(), "+"))
            .await?;
        for topic in driver.subscribe_topics() {
            self.bus.subscribe(&topic).await?;
        }

        let wb_errors = config.validate_wb_config();
        let wb_enabled = wb_errors.is_empty();
        if wb_enabled {
            self.publish_wb_meta(&config).await?;
        } else {
            for err in &wb_errors {
                tracing::warn!(device_id = %device_id, error = %err, "skipping WB publication: invalid wb_controls/wb_state_mappings");
            }
        }

        let entry = Arc::new(RegisteredDevice {
            config,
            state: Mutex::new(state.clone()),
            driver: Mutex::new(driver),
            wb_enabled,
        });
        self.devices.lock().await.insert(device_id.clone(), entry);
        self.publish_state(&device_id, &state).await?;
        Ok(())
    }

    /// Publish the device's `/meta` document, clear its `/meta/error`
    /// topic, and publish every control's `/meta`.
    async fn publish_wb_meta(&self, config: &DeviceConfig) -> Result<(), GatewayError> {
        let id = config.device_id.as_str();
        let meta = serde_json::json!({ "driver": config.device_class });
        self.bus
            .publish(&wb::device_meta_topic(id), meta.to_string().into_bytes(), true)
            .await?;
        self.bus
            .publish(&wb::device_available_topic(id), b"1".to_vec(), true)
            .await?;
        self.bus.publish(&wb::device_error_topic(id), Vec::new(), true).await?;

        for (name, def) in config.commands_in_order() {
            let control_meta = ControlMeta::for_command(name, def, config.wb_controls.get(name));
            let payload = serde_json::to_vec(&control_meta).map_err(|e| GatewayError::Storage(Box::new(e)))?;
            self.bus
                .publish(&wb::control_meta_topic(id, name), payload, true)
                .await?;
        }
        Ok(())
    }

    /// Publish the retained current value for every control mapped from
    /// device state, as configured by `wb_state_mappings`.
    async fn publish_state(&self, device_id: &DeviceId, state: &DeviceState) -> Result<(), GatewayError> {
        let Some(entry) = self.devices.lock().await.get(device_id).cloned() else {
            return Ok(());
        };
        if !entry.wb_enabled {
            return Ok(());
        }
        for (field, control) in &entry.config.wb_state_mappings {
            if let Some(value) = state.get_attr(field) {
                let payload = match value {
                    serde_json::Value::String(s) => s.into_bytes(),
                    other => other.to_string().into_bytes(),
                };
                self.bus
                    .publish(&wb::control_value_topic(device_id.as_str(), control), payload, true)
                    .await?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub async fn list_configs(&self) -> Vec<DeviceConfig> {
        self.devices.lock().await.values().map(|d| d.config.clone()).collect()
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when `device_id` is not registered.
    pub async fn get_config(&self, device_id: &DeviceId) -> Result<DeviceConfig, GatewayError> {
        let devices = self.devices.lock().await;
        let entry = devices.get(device_id).ok_or_else(|| NotFoundError {
            entity: "Device",
            id: device_id.to_string(),
        })?;
        Ok(entry.config.clone())
    }

    /// Load the last state persisted for `device_id`, regardless of whether
    /// it is currently registered.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when nothing has ever been
    /// persisted under that key, or whatever the repository returns.
    pub async fn get_persisted_state(&self, device_id: &DeviceId) -> Result<DeviceState, GatewayError> {
        self.repo.load_device_state(device_id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: device_id.to_string(),
            }
            .into()
        })
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when `device_id` is not registered.
    pub async fn get_state(&self, device_id: &DeviceId) -> Result<DeviceState, GatewayError> {
        let devices = self.devices.lock().await;
        let entry = devices.get(device_id).ok_or_else(|| NotFoundError {
            entity: "Device",
            id: device_id.to_string(),
        })?;
        Ok(entry.state.lock().await.clone())
    }

    /// Validate and execute `action` on `device_id`, persisting the
    /// resulting state and publishing it on both the WB topics and the SSE
    /// event bus.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unregistered device,
    /// [`GatewayError::Validation`] for a missing/malformed parameter, or
    /// whatever the driver itself returns.
    #[tracing::instrument(skip(self, params), fields(%device_id, action))]
    pub async fn execute_action(
        &self,
        device_id: &DeviceId,
        action: &str,
        params: &HashMap<String, serde_json::Value>,
        source: &str,
    ) -> Result<CommandResult, GatewayError> {
        let entry = {
            let devices = self.devices.lock().await;
            devices
                .get(device_id)
                .cloned()
                .ok_or_else(|| NotFoundError {
                    entity: "Device",
                    id: device_id.to_string(),
                })?
        };

        let def = entry.config.commands.get(action).ok_or_else(|| NotFoundError {
            entity: "Command",
            id: action.to_string(),
        })?;
        let resolved = resolve_and_validate(&def.params, params)?;

        let mut driver = entry.driver.lock().await;
        let result = driver.execute_action(action, &resolved).await?;
        let now = gateway_domain::time::now();

        let snapshot = if result.success {
            // Re-read the driver's own view of the world so attributes the
            // command affected (including power) land in the snapshot,
            // rather than trusting the manager to guess which fields a
            // given action touches.
            let mut fresh = driver.get_current_state().await?;
            drop(driver);
            fresh.record_command(action, source, resolved, now);
            let mut state = entry.state.lock().await;
            *state = fresh.clone();
            fresh
        } else {
            drop(driver);
            let mut state = entry.state.lock().await;
            state.record_error(result.error.clone().unwrap_or_default());
            state.clone()
        };

        self.persist_state(snapshot.clone()).await?;
        self.publish_state(device_id, &snapshot).await?;
        self.publisher
            .publish(Event::new(
                Channel::Devices,
                EventType::StateChanged,
                Some(device_id.to_string()),
                snapshot.to_json(),
            ))
            .await?;

        Ok(result)
    }

    /// Persist a device state snapshot. During normal operation this runs
    /// in the background so command dispatch isn't blocked on disk IO;
    /// once shutdown has begun it runs inline so the shutdown sequence can
    /// wait for every write to land before closing the repository.
    async fn persist_state(&self, snapshot: DeviceState) -> Result<(), GatewayError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return self.repo.save_device_state(&snapshot).await;
        }
        let repo = Arc::clone(&self.repo);
        let handle = tokio::spawn(async move {
            if let Err(err) = repo.save_device_state(&snapshot).await {
                tracing::warn!(error = %err, device_id = %snapshot.device_id, "background state persistence failed");
            }
        });
        self.persistence_tasks.lock().await.push(handle);
        Ok(())
    }

    /// Route an inbound bus message: arm the maintenance guard if it's the
    /// sentinel topic, otherwise dispatch it as a command or to the owning
    /// driver's extra-topic handler.
    pub async fn handle_bus_message(&self, topic: &str, payload: &[u8]) -> Result<(), GatewayError> {
        let now = gateway_domain::time::now();
        {
            let mut guard = self.maintenance.lock().await;
            if guard.maintenance_started(topic, now) {
                tracing::info!(topic, "maintenance guard armed");
                return Ok(());
            }
            if guard.is_armed(now) {
                tracing::debug!(topic, "suppressing bus message during maintenance window");
                return Ok(());
            }
        }

        let devices = self.devices.lock().await;
        for (device_id, entry) in devices.iter() {
            let command_prefix = format!("/devices/{}/controls/", device_id.as_str());
            if let Some(control) = topic
                .strip_prefix(command_prefix.as_str())
                .and_then(|rest| rest.strip_suffix("/on"))
            {
                // Payload maps onto the command's first declared parameter,
                // parsed per its type; commands with no parameters ignore
                // the payload entirely and are treated as a pushbutton press.
                let first_param = entry.config.commands.get(control).and_then(|def| def.params.first().cloned());
                let control = control.to_string();
                drop(devices);
                let mut params = HashMap::new();
                if let Some(param_def) = first_param {
                    let body = String::from_utf8_lossy(payload);
                    if let Some(value) = gateway_domain::command::parse_inbound_payload(&param_def, &body) {
                        params.insert(param_def.name.clone(), value);
                    }
                }
                return self
                    .execute_action(device_id, &control, &params, "bus")
                    .await
                    .map(|_| ());
            }
            if entry.driver.lock().await.subscribe_topics().iter().any(|t| t == topic) {
                let device_id = device_id.clone();
                drop(devices);
                let entry = self.devices.lock().await.get(&device_id).cloned();
                if let Some(entry) = entry {
                    entry.driver.lock().await.handle_message(topic, payload).await?;
                }
                return Ok(());
            }
        }
        Ok(())
    }

    /// Publish an arbitrary message directly to the bus, bypassing the
    /// device/command pipeline. Used by the admin `/publish` endpoint.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying bus returns.
    pub async fn publish_raw(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), GatewayError> {
        self.bus.publish(topic, payload, retain).await
    }

    /// Step 1 of shutdown: stop scheduling background persistence and
    /// switch to synchronous writes for everything that follows.
    pub fn prepare_for_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    /// Step 2 of shutdown: tell every driver to shut down and mark every
    /// device unavailable on its WB topics.
    pub async fn shutdown_all_devices(&self) {
        let devices: Vec<_> = self.devices.lock().await.values().cloned().collect();
        for entry in devices {
            if let Err(err) = entry.driver.lock().await.shutdown().await {
                tracing::warn!(device_id = %entry.config.device_id, error = %err, "driver shutdown failed");
            }
            let id = entry.config.device_id.as_str();
            if let Err(err) = self.bus.publish(&wb::device_available_topic(id), b"0".to_vec(), true).await {
                tracing::warn!(device_id = %id, error = %err, "failed to publish offline status");
            }
        }
    }

    /// Step 3 of shutdown: wait (up to `timeout`) for every background
    /// persistence task scheduled before shutdown began to finish.
    pub async fn wait_for_persistence_tasks(&self, timeout: Duration) {
        let tasks: Vec<_> = std::mem::take(&mut *self.persistence_tasks.lock().await);
        let _ = tokio::time::timeout(timeout, futures_join_all(tasks)).await;
    }

    /// Step 4 of shutdown: synchronously persist every device's current
    /// state, guaranteeing a consistent snapshot on disk even if some
    /// background writes from step 3 were still in flight.
    pub async fn persist_all_device_states(&self) -> Result<(), GatewayError> {
        let devices: Vec<_> = self.devices.lock().await.values().cloned().collect();
        for entry in devices {
            let snapshot = entry.state.lock().await.clone();
            self.repo.save_device_state(&snapshot).await?;
        }
        Ok(())
    }

    /// Step 5 of shutdown: release the repository's own resources.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying repository's `close()` returns.
    pub async fn close_repository(&self) -> Result<(), GatewayError> {
        self.repo.close().await
    }

    /// Run the full shutdown sequence in order: stop scheduling background
    /// writes, shut down every driver, wait for in-flight persistence,
    /// write a final consistent snapshot, then close the repository.
    pub async fn shutdown(&self, persistence_timeout: Duration) -> Result<(), GatewayError> {
        self.prepare_for_shutdown();
        self.shutdown_all_devices().await;
        self.wait_for_persistence_tasks(persistence_timeout).await;
        self.persist_all_device_states().await?;
        self.close_repository().await
    }
}

/// A tiny `futures::future::join_all` stand-in so this crate doesn't need
/// to pull in the `futures` crate for a single call site.
async fn futures_join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}
