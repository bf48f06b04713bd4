//! Translation of observation events into graph operations.
//!
//! Each connector owns one source's identity scheme and model catalog.
//! Connectors register themselves in `CONNECTORS` at link time.

pub mod hue;

use linkme::distributed_slice;

use crate::asset::AssetChangeEvent;
use crate::asset::AssetSnapshot;
use crate::graph::GraphOperation;

/// Ids already present in the graph store, used to find stale entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Existing<'a> {
    pub node_ids: Option<&'a [String]>,
    pub model_ids: Option<&'a [String]>,
}

/// Maps one source's events to graph operations.
///
/// Implementations are pure: the same input always yields the same list,
/// and nothing is read from or written to the outside.
pub trait Connector: Send + Sync {
    /// Source key matched against `ingest.sources_enabled`
    fn key(&self) -> &'static str;

    /// Full resync. Deletions are only emitted for the kinds of ids that
    /// `existing` supplies; without them the mapping is additive.
    fn on_snapshot(
        &self,
        snapshot: &AssetSnapshot,
        existing: Existing<'_>,
    ) -> Vec<GraphOperation>;

    fn on_change(&self, event: &AssetChangeEvent) -> Vec<GraphOperation>;
}

pub type ConnectorFactory = fn() -> Box<dyn Connector>;

#[distributed_slice]
pub static CONNECTORS: [ConnectorFactory];

/// Every connector compiled into the binary
pub fn registered() -> impl Iterator<Item = Box<dyn Connector>> {
    CONNECTORS.iter().map(|factory| factory())
}

/// The first registered connector whose key is enabled
pub fn pick(enabled: &[String]) -> Option<Box<dyn Connector>> {
    registered().find(|c| enabled.iter().any(|key| key == c.key()))
}
