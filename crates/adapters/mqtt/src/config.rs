//! MQTT bus adapter configuration.

use serde::Deserialize;

/// Configuration for the MQTT bus adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Shared topic the broker-level last will publishes to on an
    /// ungraceful disconnect of the whole bridge session. `rumqttc` only
    /// supports one last will per connection, so per-device availability
    /// LWTs are simulated at the application level (republished on
    /// reconnect) rather than registered as individual broker LWTs.
    pub bridge_will_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "gateway".to_string(),
            keep_alive_secs: 30,
            bridge_will_topic: "/devices/gateway/meta/available".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.broker_host, "localhost");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "gateway");
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.bridge_will_topic, "/devices/gateway/meta/available");
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            broker_host = "mqtt.example.com"
            broker_port = 8883
            client_id = "my-gateway"
            keep_alive_secs = 60
            bridge_will_topic = "/devices/my-gateway/meta/available"
        "#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "mqtt.example.com");
        assert_eq!(config.broker_port, 8883);
        assert_eq!(config.client_id, "my-gateway");
        assert_eq!(config.keep_alive_secs, 60);
        assert_eq!(config.bridge_will_topic, "/devices/my-gateway/meta/available");
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let toml = r#"broker_host = "192.168.1.100""#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "192.168.1.100");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "gateway");
    }
}
