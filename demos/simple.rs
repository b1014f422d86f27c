use std::sync::Arc;

use chrono::Utc;
use futures::future;
use testrun_dataload::model::{Project, SuiteRun, Tag, TestRun};
use testrun_dataload::store::MemoryStore;
use testrun_dataload::{LoaderConfig, RequestScope};
use tracing_subscriber::EnvFilter;

// Resolves a small "project -> runs -> suites + tags" graph the way sibling GraphQL resolvers
// would, and prints how many store queries it took.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let store = Arc::new(MemoryStore::new());
    store.insert_project(Project { id: "web".to_owned(), name: "Web dashboard".to_owned() });
    store.insert_tag(Tag {
        id: "nightly".to_owned(),
        category: "pipeline".to_owned(),
        value: "nightly".to_owned(),
    });
    for run in 1..=3 {
        let run_id = format!("run-{run}");
        store.insert_test_run(TestRun {
            id: run_id.clone(),
            project_id: "web".to_owned(),
            branch: Some("main".to_owned()),
            commit_hash: None,
            created_at: Utc::now(),
        });
        for suite in 1..=2 {
            store.insert_suite_run(SuiteRun {
                id: format!("{run_id}-suite-{suite}"),
                test_run_id: run_id.clone(),
                title: format!("suite {suite}"),
                started_at: Utc::now(),
            });
        }
        store.tag_test_run(&run_id, "nightly");
    }

    let config = LoaderConfig::from_env().unwrap_or_default();
    let scope = RequestScope::with_config(store.clone(), config);
    let (ctx, loaders) = (scope.ctx(), scope.loaders());

    let runs =
        loaders.test_runs_by_project.load_many(ctx, "web".to_owned()).await.unwrap_or_default();
    let resolved = future::join_all(runs.iter().map(|run| async move {
        let (suites, tags) = future::join(
            loaders.suite_runs_by_test_run.load_many(ctx, run.id.clone()),
            loaders.tags_by_test_run.load_many(ctx, run.id.clone()),
        )
        .await;
        (run.id.clone(), suites.map(|s| s.len()), tags.map(|t| t.len()))
    }))
    .await;

    for (run, suites, tags) in resolved {
        println!("{run}: suites={suites:?} tags={tags:?}");
    }
    println!("store queries: {}", store.query_count());
}
