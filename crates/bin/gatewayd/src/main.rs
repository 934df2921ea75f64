//! # gatewayd — gateway daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (TOML file + environment variable overrides)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct adapter implementations (storage, MQTT bus, in-process event bus)
//! - Construct application services, injecting adapters via port traits
//! - Load device, scenario, and room definitions from disk
//! - Build the axum router, injecting application services
//! - Bind to a TCP port and serve
//! - Handle graceful shutdown (SIGINT/SIGTERM)
//!
//! ## Dependency rule
//! This is the **only** crate that names concrete adapter types. Every other
//! crate depends on port traits declared in `gateway-app`. No domain logic
//! belongs here — only wiring.

mod config;
mod definitions;

use std::sync::Arc;
use std::time::Duration;

use gateway_adapter_mqtt::MqttBus;
use gateway_adapter_storage_sqlite_sqlx::SqliteStateRepository;
use gateway_adapter_virtual::VirtualAvDriver;
use gateway_app::event_bus::InProcessEventBus;
use gateway_app::ports::device_driver::DynDeviceDriver;
use gateway_app::ports::EventPublisher;
use gateway_app::services::device_manager::DeviceManager;
use gateway_app::services::scenario_manager::ScenarioManager;
use gateway_app::services::scenario_wb_adapter;
use gateway_domain::device::DeviceConfig;
use gateway_domain::event::{Channel, Event, EventType};
use gateway_domain::maintenance::MaintenanceGuard;

use crate::config::Config;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the driver for a device config's `device_class`. Unknown classes
/// are rejected here rather than aborting the whole load — one bad config
/// file shouldn't take the rest of the fleet down with it.
fn build_driver(config: &DeviceConfig) -> Option<Box<dyn DynDeviceDriver>> {
    match config.device_class.as_str() {
        "virtual_av" => Some(Box::new(VirtualAvDriver::new(config.device_id.clone(), config.device_name.clone()))),
        other => {
            tracing::warn!(device_id = %config.device_id, device_class = other, "unknown device class, skipping");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::fmt().with_env_filter(config.logging.filter.clone()).init();

    tracing::info!(version = VERSION, "starting gateway");

    let db_config = gateway_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    };
    let database = db_config.build().await?;
    let pool = database.pool().clone();

    let event_bus = InProcessEventBus::new(config.server.sse_queue_bound);
    let shared_event_bus = Arc::new(event_bus.clone());

    let mqtt_bus = MqttBus::connect(config.mqtt.to_mqtt_config());
    let mut inbound = mqtt_bus.take_inbound();

    let maintenance = MaintenanceGuard::new(
        config.mqtt.maintenance_sentinel_topic.clone(),
        i64::try_from(config.mqtt.maintenance_window_secs).unwrap_or(i64::MAX),
    );

    let device_manager = Arc::new(DeviceManager::new(
        SqliteStateRepository::new(pool.clone()),
        mqtt_bus,
        event_bus.clone(),
        maintenance,
    ));

    {
        let device_manager = Arc::clone(&device_manager);
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                if let Err(err) = device_manager.handle_bus_message(&message.topic, &message.payload).await {
                    tracing::warn!(topic = %message.topic, error = %err, "failed to handle inbound bus message");
                }
            }
            tracing::debug!("inbound MQTT receiver closed, stopping dispatch loop");
        });
    }

    let scenario_manager = Arc::new(ScenarioManager::new(
        SqliteStateRepository::new(pool.clone()),
        Arc::clone(&device_manager),
        event_bus.clone(),
    ));

    let device_configs = definitions::load_device_configs(&config.paths.devices_dir)?;
    for device_config in device_configs {
        let Some(driver) = build_driver(&device_config) else {
            continue;
        };
        let device_id = device_config.device_id.clone();
        if let Err(err) = device_manager.register_device(device_config, driver).await {
            tracing::warn!(device_id = %device_id, error = %err, "failed to register device, skipping");
        }
    }

    let rooms = definitions::load_rooms(&config.paths.rooms_file)?;

    let scenario_definitions = definitions::load_scenario_definitions(&config.paths.scenarios_dir)?;
    scenario_manager.load_scenarios(scenario_definitions, &rooms).await;
    scenario_manager.initialize().await?;
    scenario_wb_adapter::register_all(&device_manager, &scenario_manager).await?;

    let app_state = gateway_adapter_http_axum::state::AppState::new(
        Arc::clone(&device_manager),
        Arc::clone(&scenario_manager),
        shared_event_bus,
        rooms,
        VERSION,
        config.mqtt.broker_host.clone(),
    );

    event_bus
        .publish(Event::new(Channel::System, EventType::GatewayStarted, None, serde_json::json!({"version": VERSION})))
        .await?;

    let router = gateway_adapter_http_axum::router::build(app_state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "listening");

    let sse_shutdown_bus = event_bus.clone();
    let shutdown = async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received, notifying active SSE streams");
        sse_shutdown_bus.trigger_shutdown();
    };
    axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;

    tracing::info!("shutdown signal received, draining in-flight work");
    scenario_manager.shutdown().await?;
    device_manager
        .shutdown(Duration::from_secs(config.server.shutdown_timeout_secs))
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
