use async_trait::async_trait;

use super::model::GraphModel;
use super::operation::Edge;
use super::operation::Node;
use super::operation::PatchOp;

/// HTTP statuses worth retrying: timeouts, throttling and server errors.
pub const RETRIABLE_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("graph store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Timeouts, refused connections and other failures below HTTP.
    #[error("graph store unreachable: {0}")]
    Transport(String),

    #[error("unexpected graph store response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_retriable(&self) -> bool {
        match self {
            StoreError::Status { status, .. } => RETRIABLE_STATUSES.contains(status),
            StoreError::Transport(_) => true,
            StoreError::Decode(_) => false,
        }
    }
}

/// Primitive operations of a remote graph store.
///
/// Upserts are create-or-replace. Implementations do not retry; the executor
/// owns retry policy.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn list_model_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Create several models in one request. Bases must precede extenders.
    async fn create_models(&self, models: &[GraphModel]) -> Result<(), StoreError>;

    async fn delete_model(&self, id: &str) -> Result<(), StoreError>;

    async fn list_node_ids(&self) -> Result<Vec<String>, StoreError>;

    async fn upsert_node(&self, node: &Node) -> Result<(), StoreError>;

    async fn upsert_edge(&self, edge: &Edge) -> Result<(), StoreError>;

    async fn patch_node(&self, id: &str, patch: &[PatchOp]) -> Result<(), StoreError>;

    async fn delete_node(&self, id: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
pub use mock::MockGraphStore;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        for status in [408, 429, 500, 502, 503, 504] {
            let e = StoreError::Status {
                status,
                message: String::new(),
            };
            assert!(e.is_retriable(), "{} should be retriable", status);
        }
        for status in [400, 401, 404, 409, 412] {
            let e = StoreError::Status {
                status,
                message: String::new(),
            };
            assert!(!e.is_retriable(), "{} should not be retriable", status);
        }
        assert!(StoreError::Transport("connection reset".to_string()).is_retriable());
        assert!(!StoreError::Decode("bad json".to_string()).is_retriable());
    }
}
