//! Consumer side: observation events in, graph mutations out.

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::asset::AssetObservationEvent;
use crate::connectors::Connector;
use crate::connectors::Existing;
use crate::graph::ExecuteError;
use crate::graph::Executor;
use crate::graph::GraphOperation;
use crate::graph::GraphStore;
use crate::graph::RetryPolicy;
use crate::graph::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to list existing ids: {0}")]
    Existing(#[source] StoreError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

/// What happened to one payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied { kind: &'static str, operations: usize },
    Skipped,
}

/// Map one event with `connector`.
pub fn plan(
    connector: &dyn Connector,
    event: &AssetObservationEvent,
    existing: Existing<'_>,
) -> Vec<GraphOperation> {
    match event {
        AssetObservationEvent::Snapshot(snapshot) => connector.on_snapshot(snapshot, existing),
        AssetObservationEvent::Changes(changes) => connector.on_change(changes),
    }
}

pub struct Ingestor<G> {
    connector: Option<Box<dyn Connector>>,
    executor: Executor<G>,
    policy: RetryPolicy,
    reconcile: bool,
}

impl<G: GraphStore> Ingestor<G> {
    pub fn new(
        connector: Option<Box<dyn Connector>>,
        executor: Executor<G>,
        policy: RetryPolicy,
        reconcile: bool,
    ) -> Self {
        if connector.is_none() {
            warn!("No enabled connector is registered, every event will be skipped");
        }
        Self {
            connector,
            executor,
            policy,
            reconcile,
        }
    }

    pub fn executor(&self) -> &Executor<G> {
        &self.executor
    }

    /// Decode, map and apply one payload.
    ///
    /// Payloads that cannot be classified, or that no connector handles,
    /// are skipped. A permanent store failure is returned and the rest of
    /// that payload's operations are not applied.
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<Outcome, IngestError> {
        let event = match AssetObservationEvent::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(bytes = payload.len(), "Skipping payload: {}", e);
                return Ok(Outcome::Skipped);
            }
        };

        let Some(connector) = &self.connector else {
            debug!("Skipping {} event, no connector enabled", event.kind());
            return Ok(Outcome::Skipped);
        };

        let operations = match &event {
            AssetObservationEvent::Snapshot(_) if self.reconcile => {
                let store = self.executor.store();
                let node_ids = store.list_node_ids().await.map_err(IngestError::Existing)?;
                let model_ids = store.list_model_ids().await.map_err(IngestError::Existing)?;
                plan(
                    connector.as_ref(),
                    &event,
                    Existing {
                        node_ids: Some(&node_ids),
                        model_ids: Some(&model_ids),
                    },
                )
            }
            _ => plan(connector.as_ref(), &event, Existing::default()),
        };

        self.executor.execute(&operations, &self.policy).await?;
        info!(
            connector = connector.key(),
            count = operations.len(),
            "Applied {} event",
            event.kind()
        );
        Ok(Outcome::Applied {
            kind: event.kind(),
            operations: operations.len(),
        })
    }
}

#[cfg(feature = "transport_mqtt")]
mod subscription {
    use tokio::sync::Mutex;
    use tracing::error;
    use tracing::info;

    use super::Ingestor;
    use crate::graph::GraphStore;
    use crate::integrations::mqtt::next_inbound;
    use crate::integrations::mqtt::Inbound;
    use crate::integrations::mqtt::MqttClient;
    use crate::integrations::mqtt::MqttError;

    impl<G: GraphStore> Ingestor<G> {
        /// Consume `topic` until the connection closes. Failed payloads are
        /// logged and the loop moves on.
        pub async fn run<C: MqttClient>(
            &self,
            client: &Mutex<C>,
            topic: &str,
        ) -> Result<(), MqttError> {
            client.lock().await.subscribe(topic).await?;
            info!(topic, "Consuming observation events");

            loop {
                match next_inbound(client).await {
                    Inbound::Message(message) => {
                        if let Err(e) = self.handle_payload(&message.payload).await {
                            error!(topic = %message.topic, "Failed to apply event: {}", e);
                        }
                    }
                    Inbound::Idle => {}
                    Inbound::Closed => {
                        info!("Event subscription closed");
                        return Ok(());
                    }
                }
            }
        }
    }
}
