use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::Store;
use crate::error::StoreError;
use crate::model::{Project, SpecRun, SuiteRun, Tag, TestRun, TestRunTag, User};

#[derive(Debug, Default)]
struct Tables {
    projects: Vec<Project>,
    test_runs: Vec<TestRun>,
    suite_runs: Vec<SuiteRun>,
    spec_runs: Vec<SpecRun>,
    tags: Vec<Tag>,
    test_run_tags: Vec<TestRunTag>,
    users: Vec<User>,
}

/// In-memory [`Store`] for tests and demos.
///
/// Every query is recorded together with the ids it was asked for, and the store can be switched
/// off to simulate an unreachable database.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    queries: Mutex<Vec<(&'static str, Vec<String>)>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: RwLock::default(),
            queries: Mutex::default(),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_project(&self, project: Project) {
        self.tables.write().projects.push(project);
    }

    pub fn insert_test_run(&self, test_run: TestRun) {
        self.tables.write().test_runs.push(test_run);
    }

    pub fn insert_suite_run(&self, suite_run: SuiteRun) {
        self.tables.write().suite_runs.push(suite_run);
    }

    pub fn insert_spec_run(&self, spec_run: SpecRun) {
        self.tables.write().spec_runs.push(spec_run);
    }

    pub fn insert_tag(&self, tag: Tag) {
        self.tables.write().tags.push(tag);
    }

    /// Attaches an existing tag to a test run.
    pub fn tag_test_run(&self, test_run_id: &str, tag_id: &str) {
        self.tables.write().test_run_tags.push(TestRunTag {
            test_run_id: test_run_id.to_owned(),
            tag_id: tag_id.to_owned(),
        });
    }

    pub fn insert_user(&self, user: User) {
        self.tables.write().users.push(user);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Queries executed so far, as `(query name, requested ids)`.
    pub fn queries(&self) -> Vec<(&'static str, Vec<String>)> {
        self.queries.lock().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    fn run<T, F>(&self, name: &'static str, ids: &[String], select: F) -> Result<Vec<T>, StoreError>
    where
        F: FnOnce(&Tables) -> Vec<T>,
    {
        self.queries.lock().push((name, ids.to_vec()));
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(select(&self.tables.read()))
    }
}

fn by_ids<T: Clone>(rows: &[T], ids: &[String], id_of: impl Fn(&T) -> &str) -> Vec<T> {
    rows.iter().filter(|row| ids.iter().any(|id| id == id_of(row))).cloned().collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn projects_by_ids(&self, ids: &[String]) -> Result<Vec<Project>, StoreError> {
        self.run("projects_by_ids", ids, |t| by_ids(&t.projects, ids, |p| p.id.as_str()))
    }

    async fn test_runs_by_ids(&self, ids: &[String]) -> Result<Vec<TestRun>, StoreError> {
        self.run("test_runs_by_ids", ids, |t| by_ids(&t.test_runs, ids, |r| r.id.as_str()))
    }

    async fn tags_by_ids(&self, ids: &[String]) -> Result<Vec<Tag>, StoreError> {
        self.run("tags_by_ids", ids, |t| by_ids(&t.tags, ids, |tag| tag.id.as_str()))
    }

    async fn users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, StoreError> {
        self.run("users_by_ids", ids, |t| by_ids(&t.users, ids, |u| u.id.as_str()))
    }

    async fn test_runs_by_project_ids(
        &self,
        project_ids: &[String],
    ) -> Result<Vec<TestRun>, StoreError> {
        self.run("test_runs_by_project_ids", project_ids, |t| {
            let mut runs = by_ids(&t.test_runs, project_ids, |r| r.project_id.as_str());
            runs.sort_by_key(|r| r.created_at);
            runs
        })
    }

    async fn suite_runs_by_test_run_ids(
        &self,
        test_run_ids: &[String],
    ) -> Result<Vec<SuiteRun>, StoreError> {
        self.run("suite_runs_by_test_run_ids", test_run_ids, |t| {
            let mut suites = by_ids(&t.suite_runs, test_run_ids, |s| s.test_run_id.as_str());
            suites.sort_by_key(|s| s.started_at);
            suites
        })
    }

    async fn spec_runs_by_suite_run_ids(
        &self,
        suite_run_ids: &[String],
    ) -> Result<Vec<SpecRun>, StoreError> {
        self.run("spec_runs_by_suite_run_ids", suite_run_ids, |t| {
            let mut specs = by_ids(&t.spec_runs, suite_run_ids, |s| s.suite_run_id.as_str());
            specs.sort_by_key(|s| s.started_at);
            specs
        })
    }

    async fn test_run_tags_by_test_run_ids(
        &self,
        test_run_ids: &[String],
    ) -> Result<Vec<TestRunTag>, StoreError> {
        self.run("test_run_tags_by_test_run_ids", test_run_ids, |t| {
            by_ids(&t.test_run_tags, test_run_ids, |l| l.test_run_id.as_str())
        })
    }
}
