//! Message bus port — the MQTT-shaped publish/subscribe boundary every
//! device driver and the WB adapters are built against.
//!
//! Inbound delivery isn't part of the trait: a `Future`-returning method
//! can't yield a stream of messages without boxing, so adapters instead
//! expose a concrete `mpsc::Receiver<BusMessage>` the composition root
//! drains directly (see `gateway-adapter-mqtt`). The trait covers only the
//! half every caller needs through a single abstract type: publishing.

use std::future::Future;

use gateway_domain::error::GatewayError;

/// A message received from the bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Publish/subscribe boundary to the MQTT broker (or an in-memory stand-in
/// in tests).
pub trait MessageBusPort: Send + Sync {
    /// Publish `payload` to `topic`. WB convention: everything is retained
    /// except inbound command topics (`.../controls/{c}/on`).
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Subscribe to a topic filter (may contain MQTT wildcards).
    fn subscribe(&self, topic_filter: &str) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Register a last-will entry for `device_id`: if the connection drops
    /// uncleanly, the broker publishes `payload` to `topic` on the device's
    /// behalf. Must be called before the bus connects; entries registered
    /// after `connect()` has returned take effect only on the next
    /// reconnect.
    fn add_will_message(
        &self,
        device_id: &gateway_domain::id::DeviceId,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Forget a device's last-will entry, e.g. when it is unregistered
    /// cleanly and should no longer announce itself as unavailable on
    /// disconnect.
    fn remove_device_will_messages(
        &self,
        device_id: &gateway_domain::id::DeviceId,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
