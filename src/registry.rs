use async_trait::async_trait;
use indexmap::IndexSet;
use tokio_util::sync::CancellationToken;

use crate::{
    batch_function::{group_by_key, group_through, match_keys, BatchFunction, BatchResult},
    config::LoaderConfig,
    loader::Loader,
    model::{Project, SpecRun, SuiteRun, Tag, TestRun, User},
    relationship::RelationshipLoader,
    store::StoreHandle,
};

pub struct ProjectById;

#[async_trait]
impl BatchFunction<String, Project> for ProjectById {
    type Context = StoreHandle;

    async fn load(keys: &[String], store: &StoreHandle) -> BatchResult<Project> {
        let rows = store.projects_by_ids(keys).await?;
        Ok(match_keys(keys, rows, |p| p.id.clone()))
    }
}

pub struct TestRunById;

#[async_trait]
impl BatchFunction<String, TestRun> for TestRunById {
    type Context = StoreHandle;

    async fn load(keys: &[String], store: &StoreHandle) -> BatchResult<TestRun> {
        let rows = store.test_runs_by_ids(keys).await?;
        Ok(match_keys(keys, rows, |r| r.id.clone()))
    }
}

pub struct TagById;

#[async_trait]
impl BatchFunction<String, Tag> for TagById {
    type Context = StoreHandle;

    async fn load(keys: &[String], store: &StoreHandle) -> BatchResult<Tag> {
        let rows = store.tags_by_ids(keys).await?;
        Ok(match_keys(keys, rows, |t| t.id.clone()))
    }
}

pub struct UserById;

#[async_trait]
impl BatchFunction<String, User> for UserById {
    type Context = StoreHandle;

    async fn load(keys: &[String], store: &StoreHandle) -> BatchResult<User> {
        let rows = store.users_by_ids(keys).await?;
        Ok(match_keys(keys, rows, |u| u.id.clone()))
    }
}

pub struct TestRunsByProjectId;

#[async_trait]
impl BatchFunction<String, Vec<TestRun>> for TestRunsByProjectId {
    type Context = StoreHandle;

    async fn load(keys: &[String], store: &StoreHandle) -> BatchResult<Vec<TestRun>> {
        let rows = store.test_runs_by_project_ids(keys).await?;
        Ok(group_by_key(keys, rows, |r| r.project_id.clone()))
    }
}

pub struct SuiteRunsByTestRunId;

#[async_trait]
impl BatchFunction<String, Vec<SuiteRun>> for SuiteRunsByTestRunId {
    type Context = StoreHandle;

    async fn load(keys: &[String], store: &StoreHandle) -> BatchResult<Vec<SuiteRun>> {
        let rows = store.suite_runs_by_test_run_ids(keys).await?;
        Ok(group_by_key(keys, rows, |s| s.test_run_id.clone()))
    }
}

pub struct SpecRunsBySuiteRunId;

#[async_trait]
impl BatchFunction<String, Vec<SpecRun>> for SpecRunsBySuiteRunId {
    type Context = StoreHandle;

    async fn load(keys: &[String], store: &StoreHandle) -> BatchResult<Vec<SpecRun>> {
        let rows = store.spec_runs_by_suite_run_ids(keys).await?;
        Ok(group_by_key(keys, rows, |s| s.suite_run_id.clone()))
    }
}

/// Tags reach test runs through the `test_run_tags` association table: resolve the links, fetch
/// each distinct tag once, then rebuild the per-run lists.
pub struct TagsByTestRunId;

#[async_trait]
impl BatchFunction<String, Vec<Tag>> for TagsByTestRunId {
    type Context = StoreHandle;

    async fn load(keys: &[String], store: &StoreHandle) -> BatchResult<Vec<Tag>> {
        let links = store
            .test_run_tags_by_test_run_ids(keys)
            .await?
            .into_iter()
            .map(|l| (l.test_run_id, l.tag_id))
            .collect::<Vec<_>>();
        let tag_ids = links.iter().map(|(_, tag_id)| tag_id.clone()).collect::<IndexSet<_>>();
        let tags = if tag_ids.is_empty() {
            Vec::new()
        } else {
            store.tags_by_ids(&tag_ids.into_iter().collect::<Vec<_>>()).await?
        };
        Ok(group_through(keys, &links, tags, |t| t.id.clone()))
    }
}

/// Every loader a resolver may need, built fresh for one inbound request.
///
/// The caches inside live exactly as long as this value, so it must never be shared between
/// requests.
pub struct Loaders {
    pub projects: Loader<String, Project>,
    pub test_runs: Loader<String, TestRun>,
    pub tags: Loader<String, Tag>,
    pub users: Loader<String, User>,
    pub test_runs_by_project: RelationshipLoader<String, TestRun>,
    pub suite_runs_by_test_run: RelationshipLoader<String, SuiteRun>,
    pub spec_runs_by_suite_run: RelationshipLoader<String, SpecRun>,
    pub tags_by_test_run: RelationshipLoader<String, Tag>,
}

impl Loaders {
    /// Must be called from within a tokio runtime; each loader spawns its worker.
    pub fn new(store: StoreHandle) -> Self {
        Self::with_config(store, LoaderConfig::default())
    }

    pub fn with_config(store: StoreHandle, config: LoaderConfig) -> Self {
        tracing::trace!(?config, "building request loaders");
        Self {
            projects: Loader::with_config(ProjectById, store.clone(), config),
            test_runs: Loader::with_config(TestRunById, store.clone(), config),
            tags: Loader::with_config(TagById, store.clone(), config),
            users: Loader::with_config(UserById, store.clone(), config),
            test_runs_by_project: RelationshipLoader::with_config(
                TestRunsByProjectId,
                store.clone(),
                config,
            ),
            suite_runs_by_test_run: RelationshipLoader::with_config(
                SuiteRunsByTestRunId,
                store.clone(),
                config,
            ),
            spec_runs_by_suite_run: RelationshipLoader::with_config(
                SpecRunsBySuiteRunId,
                store.clone(),
                config,
            ),
            tags_by_test_run: RelationshipLoader::with_config(TagsByTestRunId, store, config),
        }
    }
}

/// Per-request execution context handed to resolvers: the request's cancellation token and its
/// own [`Loaders`].
///
/// Cancelling the token (client disconnect, deadline) aborts every load still waiting under this
/// scope. Dropping the scope drops the loaders and their caches.
pub struct RequestScope {
    cancel: CancellationToken,
    loaders: Loaders,
}

impl RequestScope {
    pub fn new(store: StoreHandle) -> Self {
        Self::with_config(store, LoaderConfig::default())
    }

    pub fn with_config(store: StoreHandle, config: LoaderConfig) -> Self {
        Self { cancel: CancellationToken::new(), loaders: Loaders::with_config(store, config) }
    }

    /// Builds a scope whose cancellation follows `parent`, e.g. a server-wide shutdown token.
    pub fn child_of(parent: &CancellationToken, store: StoreHandle, config: LoaderConfig) -> Self {
        Self { cancel: parent.child_token(), loaders: Loaders::with_config(store, config) }
    }

    pub fn loaders(&self) -> &Loaders {
        &self.loaders
    }

    pub fn ctx(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}
