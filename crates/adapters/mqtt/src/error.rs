//! MQTT adapter error types.

use gateway_domain::error::GatewayError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The MQTT client has not been initialised yet.
    #[error("MQTT client not connected")]
    NotConnected,

    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl From<MqttError> for GatewayError {
    fn from(err: MqttError) -> Self {
        Self::Bus(Box::new(err))
    }
}
