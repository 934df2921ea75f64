//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `gateway.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use gateway_adapter_mqtt::MqttConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP+SSE server settings.
    pub server: ServerConfig,
    /// `SQLite` database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// MQTT bus settings.
    pub mqtt: MqttSection,
    /// Filesystem paths for device/scenario/room definitions.
    pub paths: PathsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// How long to wait for in-flight persistence tasks during shutdown.
    pub shutdown_timeout_secs: u64,
    /// Bound on the in-process SSE broadcast channel's buffered events.
    pub sse_queue_bound: usize,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// MQTT settings as they appear in `gateway.toml`; converted into
/// [`MqttConfig`] (the adapter's own config type) plus maintenance-guard
/// settings that belong to the domain, not the bus adapter.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MqttSection {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Topic the bridge's own broker-level last will publishes to.
    pub bridge_will_topic: String,
    /// Topic the rule engine publishes to when it comes back online after a
    /// restart; arms the maintenance guard.
    pub maintenance_sentinel_topic: String,
    /// How long the maintenance guard suppresses bus-origin mutations for,
    /// once armed.
    pub maintenance_window_secs: u64,
}

impl MqttSection {
    #[must_use]
    pub fn to_mqtt_config(&self) -> MqttConfig {
        MqttConfig {
            broker_host: self.broker_host.clone(),
            broker_port: self.broker_port,
            client_id: self.client_id.clone(),
            keep_alive_secs: self.keep_alive_secs,
            bridge_will_topic: self.bridge_will_topic.clone(),
        }
    }
}

/// Filesystem locations of device, scenario, and room definitions.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory containing one JSON device config per file.
    pub devices_dir: String,
    /// Directory containing one JSON scenario definition per file.
    pub scenarios_dir: String,
    /// Path to the `rooms.json` file mapping `room_id` to room definition.
    pub rooms_file: String,
}

impl Config {
    /// Load configuration from `gateway.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("gateway.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GATEWAY_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("GATEWAY_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("GATEWAY_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("GATEWAY_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("GATEWAY_MQTT_BROKER_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("GATEWAY_MQTT_BROKER_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.broker_port = port;
            }
        }
        if let Ok(val) = std::env::var("GATEWAY_MQTT_CLIENT_ID") {
            self.mqtt.client_id = val;
        }
        if let Ok(val) = std::env::var("GATEWAY_DEVICES_DIR") {
            self.paths.devices_dir = val;
        }
        if let Ok(val) = std::env::var("GATEWAY_SCENARIOS_DIR") {
            self.paths.scenarios_dir = val;
        }
        if let Ok(val) = std::env::var("GATEWAY_ROOMS_FILE") {
            self.paths.rooms_file = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            shutdown_timeout_secs: 5,
            sse_queue_bound: 256,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:gateway.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "gatewayd=info,gateway_app=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "gateway".to_string(),
            keep_alive_secs: 30,
            bridge_will_topic: "/devices/gateway/meta/available".to_string(),
            maintenance_sentinel_topic: gateway_domain::maintenance::DEFAULT_SENTINEL_TOPIC.to_string(),
            maintenance_window_secs: 10,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            devices_dir: "devices".to_string(),
            scenarios_dir: "scenarios".to_string(),
            rooms_file: "rooms.json".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
