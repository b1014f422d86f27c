use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Project, SpecRun, SuiteRun, Tag, TestRun, TestRunTag, User};

mod memory;

pub use memory::MemoryStore;

/// Shared handle to the persistence layer, used as the context of every loader in a
/// [`crate::Loaders`] registry.
pub type StoreHandle = Arc<dyn Store>;

/// Batched queries the loaders are built on.
///
/// Every method answers a whole batch of ids with one query. Point lookups return matching rows in
/// any order and simply omit ids that do not exist. Child lookups return rows in their natural
/// order (by start or creation time); the loaders never reorder them.
#[async_trait]
pub trait Store: Send + Sync {
    async fn projects_by_ids(&self, ids: &[String]) -> Result<Vec<Project>, StoreError>;
    async fn test_runs_by_ids(&self, ids: &[String]) -> Result<Vec<TestRun>, StoreError>;
    async fn tags_by_ids(&self, ids: &[String]) -> Result<Vec<Tag>, StoreError>;
    async fn users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, StoreError>;

    async fn test_runs_by_project_ids(
        &self,
        project_ids: &[String],
    ) -> Result<Vec<TestRun>, StoreError>;
    async fn suite_runs_by_test_run_ids(
        &self,
        test_run_ids: &[String],
    ) -> Result<Vec<SuiteRun>, StoreError>;
    async fn spec_runs_by_suite_run_ids(
        &self,
        suite_run_ids: &[String],
    ) -> Result<Vec<SpecRun>, StoreError>;
    async fn test_run_tags_by_test_run_ids(
        &self,
        test_run_ids: &[String],
    ) -> Result<Vec<TestRunTag>, StoreError>;
}
