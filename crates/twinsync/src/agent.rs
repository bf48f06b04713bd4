//! Producer side: the poller plus on-demand full snapshots.

use std::sync::Arc;

use tracing::info;

use crate::asset::AssetObservationEvent;
use crate::monitor::ObserveError;
use crate::monitor::Observer;
use crate::monitor::Poller;
use crate::monitor::PollerError;
use crate::monitor::PollerState;
use crate::monitor::PublishError;
use crate::monitor::Publisher;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Poller(#[from] PollerError),

    #[error("snapshot failed: {0}")]
    Observe(#[from] ObserveError),

    #[error("failed to publish snapshot: {0}")]
    Publish(#[from] PublishError),

    #[cfg(feature = "transport_mqtt")]
    #[error(transparent)]
    Mqtt(#[from] crate::integrations::mqtt::MqttError),
}

pub struct Agent<O, P> {
    poller: Poller<O, P>,
    /// Where resync snapshots go; normally the poller's own event channel
    snapshots: Arc<dyn Publisher>,
}

impl<O, P> Agent<O, P>
where
    O: Observer + 'static,
    P: Publisher + 'static,
{
    pub fn new(poller: Poller<O, P>, snapshots: Arc<dyn Publisher>) -> Self {
        Self { poller, snapshots }
    }

    pub fn poller(&self) -> &Poller<O, P> {
        &self.poller
    }

    /// Publish a full snapshot with the poller held off meanwhile. Ticking
    /// resumes afterwards even when the snapshot fails.
    pub async fn resync(&self) -> Result<(), AgentError> {
        let paused = self.poller.pause();
        let result = self.publish_snapshot().await;
        if paused {
            self.poller.resume();
        }
        result
    }

    async fn publish_snapshot(&self) -> Result<(), AgentError> {
        let snapshot = self.poller.snapshot().await?;
        let count = snapshot.lights.len() + snapshot.sensors.len();
        self.snapshots
            .publish(&AssetObservationEvent::Snapshot(snapshot))
            .await?;
        info!(count, "Published resync snapshot");
        Ok(())
    }
}

#[cfg(feature = "transport_mqtt")]
mod run {
    use std::future::Future;

    use tokio::sync::Mutex;
    use tracing::error;
    use tracing::info;

    use super::Agent;
    use super::AgentError;
    use crate::integrations::mqtt::next_inbound;
    use crate::integrations::mqtt::Inbound;
    use crate::integrations::mqtt::MqttClient;
    use crate::monitor::Observer;
    use crate::monitor::Publisher;

    impl<O, P> Agent<O, P>
    where
        O: Observer + 'static,
        P: Publisher + 'static,
    {
        /// Start polling and serve resync requests until `shutdown`
        /// resolves, then stop the poller.
        pub async fn run<C, F>(
            &self,
            client: &Mutex<C>,
            resync_topic: Option<&str>,
            shutdown: F,
        ) -> Result<(), AgentError>
        where
            C: MqttClient,
            F: Future<Output = ()>,
        {
            self.poller.start().await?;

            let mut listening = false;
            if let Some(topic) = resync_topic {
                if let Err(e) = client.lock().await.subscribe(topic).await {
                    self.poller.stop();
                    return Err(e.into());
                }
                info!(topic, "Listening for resync requests");
                listening = true;
            }

            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    inbound = next_inbound(client), if listening => match inbound {
                        Inbound::Message(message) => {
                            info!(topic = %message.topic, "Resync requested");
                            if let Err(e) = self.resync().await {
                                error!("Resync failed: {}", e);
                            }
                        }
                        Inbound::Idle => {}
                        Inbound::Closed => {
                            error!("MQTT connection closed, no more resync requests");
                            listening = false;
                        }
                    },
                }
            }

            info!("Shutting down");
            self.poller.stop();
            Ok(())
        }
    }
}
