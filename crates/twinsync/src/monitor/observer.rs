use async_trait::async_trait;

use crate::asset::Population;

#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    #[error("gateway request failed: {0}")]
    Request(String),

    #[error("gateway returned an error: {0}")]
    Gateway(String),

    #[error("unexpected gateway response: {0}")]
    Malformed(String),
}

/// Reads the current device population from a gateway.
#[async_trait]
pub trait Observer: Send + Sync {
    async fn observe(&self) -> Result<Population, ObserveError>;
}
