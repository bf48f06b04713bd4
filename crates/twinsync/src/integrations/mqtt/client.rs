use std::time::Duration;

use async_trait::async_trait;
use rumqttc::AsyncClient;
use rumqttc::Event;
use rumqttc::MqttOptions;
use rumqttc::Packet;
use rumqttc::QoS;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use tracing::warn;

use crate::config::MqttConfig;

/// Observation events are a few kilobytes per device; leave headroom for
/// large bridges.
const MAX_PACKET_SIZE: usize = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    #[error("MQTT client not connected, call connect() first")]
    NotConnected,

    #[error("MQTT request failed: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// MQTT message received from a subscription
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// MQTT client operations, mockable for tests.
#[async_trait]
pub trait MqttClient: Send + Sync {
    async fn connect(&mut self) -> Result<(), MqttError>;

    async fn subscribe(&mut self, topic: &str) -> Result<(), MqttError>;

    /// Publish at QoS 1
    async fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), MqttError>;

    /// Next message from the subscribed topics. `None` once the connection
    /// is gone for good.
    async fn poll_message(&mut self) -> Option<MqttMessage>;
}

/// Mock MQTT client for testing
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockMqttClient {
    pub messages: std::collections::VecDeque<MqttMessage>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, Vec<u8>, bool)>,
    pub is_connected: bool,
    /// Publishes that fail before the next one succeeds
    pub publish_failures: usize,
}

#[cfg(test)]
impl MockMqttClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, topic: &str, payload: &[u8]) {
        self.messages.push_back(MqttMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
    }
}

#[cfg(test)]
#[async_trait]
impl MqttClient for MockMqttClient {
    async fn connect(&mut self) -> Result<(), MqttError> {
        self.is_connected = true;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        if !self.is_connected {
            return Err(MqttError::NotConnected);
        }
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), MqttError> {
        if !self.is_connected || self.publish_failures > 0 {
            self.publish_failures = self.publish_failures.saturating_sub(1);
            return Err(MqttError::NotConnected);
        }
        self.published.push((topic.to_string(), payload.to_vec(), retain));
        Ok(())
    }

    async fn poll_message(&mut self) -> Option<MqttMessage> {
        self.messages.pop_front()
    }
}

/// MQTT client backed by rumqttc
pub struct RumqttcClient {
    /// Connection options, used when `connect` creates the client
    mqtt_options: MqttOptions,

    client: Option<AsyncClient>,

    message_rx: Option<mpsc::UnboundedReceiver<MqttMessage>>,

    event_loop_task: Option<JoinHandle<()>>,
}

impl RumqttcClient {
    pub fn new(config: &MqttConfig) -> Self {
        let mut mqtt_options =
            MqttOptions::new(config.client_id.clone(), config.broker.clone(), config.port);
        mqtt_options.set_keep_alive(Duration::from_secs(30));
        mqtt_options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            mqtt_options.set_credentials(username, password);
        }

        Self {
            mqtt_options,
            client: None,
            message_rx: None,
            event_loop_task: None,
        }
    }

    fn client(&self) -> Result<&AsyncClient, MqttError> {
        self.client.as_ref().ok_or(MqttError::NotConnected)
    }
}

#[async_trait]
impl MqttClient for RumqttcClient {
    async fn connect(&mut self) -> Result<(), MqttError> {
        let (client, mut event_loop) = AsyncClient::new(self.mqtt_options.clone(), 10);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let msg = MqttMessage {
                            topic: publish.topic.to_string(),
                            payload: publish.payload.to_vec(),
                        };
                        if message_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // rumqttc reconnects on the next poll
                        warn!("MQTT event loop error: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
            info!("MQTT event loop task exiting");
        });

        self.client = Some(client);
        self.message_rx = Some(message_rx);
        self.event_loop_task = Some(task);
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        self.client()?.subscribe(topic, QoS::AtLeastOnce).await?;
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), MqttError> {
        self.client()?
            .publish(topic, QoS::AtLeastOnce, retain, payload.to_vec())
            .await?;
        Ok(())
    }

    async fn poll_message(&mut self) -> Option<MqttMessage> {
        match &mut self.message_rx {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }
}

impl Drop for RumqttcClient {
    fn drop(&mut self) {
        if let Some(task) = self.event_loop_task.take() {
            task.abort();
        }
    }
}
