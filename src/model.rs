//! Rows served by the dashboard's loaders.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRun {
    pub id: String,
    pub project_id: String,
    pub branch: Option<String>,
    pub commit_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One test suite (file or describe block) executed as part of a test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteRun {
    pub id: String,
    pub test_run_id: String,
    pub title: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecStatus {
    Passed,
    Failed,
    Skipped,
}

/// One spec (test case) executed as part of a suite run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRun {
    pub id: String,
    pub suite_run_id: String,
    pub title: String,
    pub status: SpecStatus,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub category: String,
    pub value: String,
}

/// Association row between a test run and a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunTag {
    pub test_run_id: String,
    pub tag_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
}
