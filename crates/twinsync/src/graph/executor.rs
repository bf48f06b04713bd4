use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::model::GraphModel;
use super::operation::GraphOperation;
use super::store::GraphStore;
use super::store::StoreError;
use crate::time::Sleeper;
use crate::time::TokioSleeper;

/// Bounded exponential backoff for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt, so at most `max_retries + 1` calls
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(8000),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `attempt + 1`: `min(max, base * 2^attempt)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{operation} {target} failed after {attempts} attempt(s): {source}")]
pub struct ExecuteError {
    pub operation: &'static str,
    pub target: String,
    pub attempts: u32,
    #[source]
    pub source: StoreError,
}

/// Applies operation lists to a graph store, strictly in order.
pub struct Executor<G> {
    store: G,
    sleeper: Arc<dyn Sleeper>,
    replace_existing_models: bool,
}

impl<G: GraphStore> Executor<G> {
    pub fn new(store: G) -> Self {
        Self {
            store,
            sleeper: Arc::new(TokioSleeper),
            replace_existing_models: false,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Make `EnsureModels` delete and recreate models that already exist,
    /// instead of only creating the missing ones.
    pub fn replace_existing_models(mut self, replace: bool) -> Self {
        self.replace_existing_models = replace;
        self
    }

    pub fn store(&self) -> &G {
        &self.store
    }

    /// Apply every operation in order. The first permanent failure aborts
    /// the rest of the list. Patching a node the store does not have is
    /// logged and skipped.
    pub async fn execute(
        &self,
        operations: &[GraphOperation],
        policy: &RetryPolicy,
    ) -> Result<(), ExecuteError> {
        for operation in operations {
            self.execute_one(operation, policy).await?;
        }
        debug!(count = operations.len(), "Applied graph operations");
        Ok(())
    }

    async fn execute_one(
        &self,
        operation: &GraphOperation,
        policy: &RetryPolicy,
    ) -> Result<(), ExecuteError> {
        let kind = operation.kind();
        let mut attempt = 0;
        loop {
            let e = match self.apply(operation).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            // The next snapshot creates the node; the rest of the batch still applies.
            if matches!(operation, GraphOperation::PatchNode { .. }) && e.status() == Some(404) {
                warn!(id = operation.target(), "Node to patch does not exist, skipping");
                return Ok(());
            }

            if e.is_retriable() && attempt < policy.max_retries {
                let delay = policy.backoff(attempt);
                warn!(
                    op = kind,
                    id = operation.target(),
                    attempt,
                    status = ?e.status(),
                    "Graph operation failed, retrying in {}ms: {}",
                    delay.as_millis(),
                    e
                );
                self.sleeper.sleep(delay).await;
                attempt += 1;
                continue;
            }

            error!(
                op = kind,
                id = operation.target(),
                attempt,
                status = ?e.status(),
                "Graph operation failed permanently: {}",
                e
            );
            return Err(ExecuteError {
                operation: kind,
                target: operation.target().to_string(),
                attempts: attempt + 1,
                source: e,
            });
        }
    }

    async fn apply(&self, operation: &GraphOperation) -> Result<(), StoreError> {
        match operation {
            GraphOperation::EnsureModels { models } => self.ensure_models(models).await,
            GraphOperation::UpsertNode(node) => self.store.upsert_node(node).await,
            GraphOperation::UpsertEdge(edge) => self.store.upsert_edge(edge).await,
            GraphOperation::PatchNode { id, patch } => self.store.patch_node(id, patch).await,
            GraphOperation::DeleteNode { id } => self.store.delete_node(id).await,
            GraphOperation::DeleteModel { id } => self.store.delete_model(id).await,
        }
    }

    async fn ensure_models(&self, models: &[GraphModel]) -> Result<(), StoreError> {
        let existing: HashSet<String> = self.store.list_model_ids().await?.into_iter().collect();

        if self.replace_existing_models {
            // Extenders must go before their bases.
            for model in models.iter().rev().filter(|m| existing.contains(&m.id)) {
                match self.store.delete_model(&model.id).await {
                    Ok(()) => info!("Deleted existing model {}", model.id),
                    Err(e) => warn!(
                        "Failed to delete model {}, creating anyway: {}",
                        model.id, e
                    ),
                }
            }
            if !models.is_empty() {
                self.store.create_models(models).await?;
                info!("Created or replaced {} models", models.len());
            }
            return Ok(());
        }

        let missing: Vec<GraphModel> = models
            .iter()
            .filter(|m| !existing.contains(&m.id))
            .cloned()
            .collect();
        if missing.is_empty() {
            debug!("All {} models already present", models.len());
            return Ok(());
        }

        self.store.create_models(&missing).await?;
        info!("Created {} missing models", missing.len());
        Ok(())
    }
}
