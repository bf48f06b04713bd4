mod change;
mod event;
mod model;

pub use change::AssetChange;
pub use change::AssetChangeEvent;
pub use change::ChangeKind;
pub use change::PropertyChange;
pub use event::AssetObservationEvent;
pub use event::DecodeError;
pub use model::timestamp_now;
pub use model::Asset;
pub use model::AssetKind;
pub use model::AssetSnapshot;
pub use model::Population;
