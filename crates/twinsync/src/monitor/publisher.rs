use async_trait::async_trait;

use crate::asset::AssetObservationEvent;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport failed: {0}")]
    Transport(String),
}

/// Hands observation events to the outer transport.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, event: &AssetObservationEvent) -> Result<(), PublishError>;
}
