//! Producer side: observe a gateway, detect changes, publish them.

mod diff;
mod observer;
mod poller;
mod publisher;
mod store;

pub use diff::compare_states;
pub use diff::diff;
pub use diff::diff_population;
pub use observer::ObserveError;
pub use observer::Observer;
pub use poller::Poller;
pub use poller::PollerError;
pub use poller::PollerState;
pub use publisher::PublishError;
pub use publisher::Publisher;
pub use store::SnapshotStore;
pub use store::SnapshotStoreError;
pub use store::STATE_FILE;
