//! MQTT transport for observation events.

mod client;
mod publisher;

use std::time::Duration;

use tokio::sync::Mutex;

#[cfg(test)]
pub use client::MockMqttClient;
pub use client::MqttClient;
pub use client::MqttError;
pub use client::MqttMessage;
pub use client::RumqttcClient;
pub use publisher::MqttPublisher;

/// How long a subscription loop holds the client lock while waiting.
const POLL_WINDOW: Duration = Duration::from_millis(100);

/// Result of one bounded wait on a shared client
#[derive(Debug)]
pub enum Inbound {
    Message(MqttMessage),
    /// Nothing arrived within the window
    Idle,
    /// The connection is gone and no more messages will arrive
    Closed,
}

/// Wait briefly for the next message without starving publishers that
/// share the client.
pub async fn next_inbound<C: MqttClient>(client: &Mutex<C>) -> Inbound {
    let polled = {
        let mut client = client.lock().await;
        tokio::time::timeout(POLL_WINDOW, client.poll_message()).await
    };
    match polled {
        Ok(Some(message)) => Inbound::Message(message),
        Ok(None) => Inbound::Closed,
        Err(_) => {
            tokio::task::yield_now().await;
            Inbound::Idle
        }
    }
}
