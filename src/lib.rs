//! Request-scoped batching loaders for the test-reporting dashboard.
//!
//! Concurrent point lookups issued by GraphQL resolvers are coalesced into one batched fetch per
//! short window, deduplicated, cached for the lifetime of the request, and fanned back out to each
//! caller by key. See [`Loader`] for single-entity lookups, [`RelationshipLoader`] for one-to-many
//! lookups and [`Loaders`] for the per-request registry.

mod batch_function;
mod cache;
mod config;
mod error;
mod loader;
mod loader_op;
mod loader_worker;
pub mod model;
mod registry;
mod relationship;
pub mod store;
#[cfg(feature = "stats")]
mod worker_stats;

pub use batch_function::{group_by_key, group_through, match_keys, BatchFunction, BatchResult};
pub use config::LoaderConfig;
pub use error::{ConfigError, LoadError, StoreError};
pub use loader::Loader;
pub use registry::{
    Loaders, ProjectById, RequestScope, SpecRunsBySuiteRunId, SuiteRunsByTestRunId, TagById,
    TagsByTestRunId, TestRunById, TestRunsByProjectId, UserById,
};
pub use relationship::RelationshipLoader;
pub use tokio_util::sync::CancellationToken;
