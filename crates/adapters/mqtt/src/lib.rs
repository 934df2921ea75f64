//! # gateway-adapter-mqtt
//!
//! MQTT adapter — bridges the gateway's device and scenario bus to an MQTT
//! broker via `rumqttc`, implementing [`MessageBusPort`].
//!
//! ## Topic conventions
//!
//! Topics follow the Wiren Board virtual-device protocol (see
//! `gateway_domain::wb`): `/devices/{id}/meta`, `/devices/{id}/controls/{c}`,
//! `/devices/{id}/controls/{c}/on`, and so on. Everything is retained except
//! inbound command topics.
//!
//! ## Inbound delivery
//!
//! `MessageBusPort` only covers outbound publish/subscribe; a trait method
//! returning `impl Future` can't also yield a stream. Instead, [`MqttBus::connect`]
//! spawns a task that polls the `rumqttc` event loop and forwards incoming
//! `Publish` packets onto an `mpsc::Receiver<BusMessage>`, which
//! [`MqttBus::take_inbound`] hands to the composition root to drain.
//!
//! ## Dependency rule
//!
//! Same as the other adapters: depends on `gateway-app` and `gateway-domain`
//! only.

mod config;
mod error;

pub use config::MqttConfig;
pub use error::MqttError;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use gateway_app::ports::message_bus::{BusMessage, MessageBusPort};
use gateway_domain::error::GatewayError;
use gateway_domain::id::DeviceId;

/// A device's registered last-will entry, published by the broker if the
/// bridge connection drops uncleanly.
#[derive(Debug, Clone)]
struct WillEntry {
    topic: String,
    payload: Vec<u8>,
    retain: bool,
}

/// MQTT-backed [`MessageBusPort`].
///
/// `rumqttc` supports a single last-will per connection, so only the
/// most recently registered device will becomes the broker's actual LWT;
/// every device's `/meta/available` is additionally republished as `false`
/// by the device manager during an orderly shutdown (`DeviceManager::shutdown_all_devices`),
/// which covers the common path. The registry here exists so a future
/// reconnect can re-derive the right broker-level will without callers
/// needing to re-register it.
pub struct MqttBus {
    config: MqttConfig,
    client: AsyncClient,
    eventloop_handle: Mutex<Option<JoinHandle<()>>>,
    inbound_rx: Mutex<Option<mpsc::Receiver<BusMessage>>>,
    wills: Mutex<HashMap<DeviceId, WillEntry>>,
}

impl MqttBus {
    /// Build the client and spawn the event-loop poller, but do not yet
    /// subscribe to anything — callers register subscriptions via
    /// [`MessageBusPort::subscribe`] once devices are set up.
    #[must_use]
    pub fn connect(config: MqttConfig) -> Self {
        let opts = Self::mqtt_options(&config);
        let (client, eventloop) = AsyncClient::new(opts, 64);
        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let handle = tokio::spawn(Self::drive_eventloop(eventloop, inbound_tx));
        Self {
            config,
            client,
            eventloop_handle: Mutex::new(Some(handle)),
            inbound_rx: Mutex::new(Some(inbound_rx)),
            wills: Mutex::new(HashMap::new()),
        }
    }

    fn mqtt_options(config: &MqttConfig) -> MqttOptions {
        let mut opts = MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        opts.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
        opts.set_last_will(LastWill::new(
            &config.bridge_will_topic,
            b"false".to_vec(),
            QoS::AtLeastOnce,
            true,
        ));
        opts
    }

    /// Take the inbound message receiver. Must be called exactly once; the
    /// composition root owns draining it into `DeviceManager::handle_bus_message`.
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub fn take_inbound(&self) -> mpsc::Receiver<BusMessage> {
        self.inbound_rx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .expect("inbound receiver already taken")
    }

    async fn drive_eventloop(mut eventloop: EventLoop, tx: mpsc::Sender<BusMessage>) {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = BusMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    };
                    if tx.send(message).await.is_err() {
                        tracing::debug!("inbound receiver dropped, stopping MQTT event loop");
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(%err, "MQTT connection error, retrying");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    /// Stop the event-loop task. Intended for graceful shutdown.
    pub async fn disconnect(&self) {
        if let Some(handle) = self
            .eventloop_handle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        if let Err(err) = self.client.disconnect().await {
            tracing::debug!(%err, "error disconnecting MQTT client");
        }
    }
}

impl MessageBusPort for MqttBus {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        let client = self.client.clone();
        let topic = topic.to_string();
        async move {
            client
                .publish(&topic, QoS::AtLeastOnce, retain, payload)
                .await
                .map_err(MqttError::Client)?;
            Ok(())
        }
    }

    fn subscribe(&self, topic_filter: &str) -> impl Future<Output = Result<(), GatewayError>> + Send {
        let client = self.client.clone();
        let topic_filter = topic_filter.to_string();
        async move {
            client
                .subscribe(&topic_filter, QoS::AtLeastOnce)
                .await
                .map_err(MqttError::Client)?;
            tracing::debug!(topic = %topic_filter, "subscribed");
            Ok(())
        }
    }

    fn add_will_message(
        &self,
        device_id: &DeviceId,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        let device_id = device_id.clone();
        let topic = topic.to_string();
        async move {
            self.wills
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(device_id, WillEntry { topic, payload, retain });
            Ok(())
        }
    }

    fn remove_device_will_messages(&self, device_id: &DeviceId) -> impl Future<Output = Result<(), GatewayError>> + Send {
        let device_id = device_id.clone();
        async move {
            self.wills
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(&device_id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_mqtt_options_with_keep_alive_and_bridge_will() {
        let config = MqttConfig {
            keep_alive_secs: 45,
            ..MqttConfig::default()
        };
        let opts = MqttBus::mqtt_options(&config);
        assert_eq!(opts.keep_alive(), Duration::from_secs(45));
        assert!(opts.last_will().is_some());
    }
}
