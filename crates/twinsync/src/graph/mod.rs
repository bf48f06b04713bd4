//! Graph side: models, operations and applying them to a store.

mod executor;
#[cfg(feature = "http")]
mod http;
mod model;
mod operation;
mod store;

pub use executor::ExecuteError;
pub use executor::Executor;
pub use executor::RetryPolicy;
#[cfg(feature = "http")]
pub use http::HttpGraphStore;
pub use model::ComplexSchema;
pub use model::Content;
pub use model::GraphModel;
pub use model::MapEntry;
pub use model::ModelCatalog;
pub use model::Primitive;
pub use model::Schema;
pub use model::DTDL_CONTEXT;
pub use operation::summarize;
pub use operation::Edge;
pub use operation::GraphOperation;
pub use operation::Node;
pub use operation::PatchOp;
pub use operation::PatchOpKind;
pub use store::GraphStore;
pub use store::StoreError;
pub use store::RETRIABLE_STATUSES;
#[cfg(test)]
pub use store::MockGraphStore;
