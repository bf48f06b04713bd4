use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::client::MqttClient;
use crate::asset::AssetObservationEvent;
use crate::monitor::PublishError;
use crate::monitor::Publisher;

/// Publishes observation events on one MQTT topic, not retained.
pub struct MqttPublisher<C> {
    client: Arc<Mutex<C>>,
    topic: String,
}

impl<C: MqttClient> MqttPublisher<C> {
    pub fn new(client: Arc<Mutex<C>>, topic: impl Into<String>) -> Self {
        Self {
            client,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl<C: MqttClient> Publisher for MqttPublisher<C> {
    async fn publish(&self, event: &AssetObservationEvent) -> Result<(), PublishError> {
        let payload = event.to_vec()?;
        self.client
            .lock()
            .await
            .publish(&self.topic, &payload, false)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        debug!(
            topic = %self.topic,
            bytes = payload.len(),
            "Published {} event",
            event.kind()
        );
        Ok(())
    }
}
