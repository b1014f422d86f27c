use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use parking_lot::Mutex;
use testrun_dataload::{
    group_by_key, BatchFunction, BatchResult, CancellationToken, RelationshipLoader,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Suite {
    id: u32,
    parent: String,
}

fn suite(id: u32, parent: &str) -> Suite {
    Suite { id, parent: parent.to_owned() }
}

struct SuiteRows {
    rows: Vec<Suite>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

struct SuitesByParent;

#[async_trait]
impl BatchFunction<String, Vec<Suite>> for SuitesByParent {
    type Context = SuiteRows;
    async fn load(keys: &[String], context: &SuiteRows) -> BatchResult<Vec<Suite>> {
        context.batches.lock().push(keys.to_vec());
        let children = context.rows.iter().filter(|s| keys.contains(&s.parent)).cloned().collect();
        Ok(group_by_key(keys, children, |s: &Suite| s.parent.clone()))
    }
}

fn loader() -> (RelationshipLoader<String, Suite>, Arc<Mutex<Vec<Vec<String>>>>) {
    let batches = Arc::new(Mutex::new(Vec::new()));
    let context = SuiteRows {
        rows: vec![suite(1, "T1"), suite(2, "T1"), suite(3, "T2")],
        batches: batches.clone(),
    };
    (RelationshipLoader::new(SuitesByParent, context), batches)
}

#[tokio::test]
async fn children_are_grouped_by_parent() {
    let ctx = CancellationToken::new();
    let (suites, batches) = loader();

    let (t1, t2, t3) = future::join3(
        suites.load_many(&ctx, "T1".to_owned()),
        suites.load_many(&ctx, "T2".to_owned()),
        suites.load_many(&ctx, "T3".to_owned()),
    )
    .await;

    assert_eq!(t1, Ok(vec![suite(1, "T1"), suite(2, "T1")]));
    assert_eq!(t2, Ok(vec![suite(3, "T2")]));
    assert_eq!(t3, Ok(vec![]));
    assert_eq!(
        batches.lock().clone(),
        vec![vec!["T1".to_owned(), "T2".to_owned(), "T3".to_owned()]]
    );
}

#[tokio::test]
async fn empty_relationship_is_cached_like_any_other() {
    let ctx = CancellationToken::new();
    let (suites, batches) = loader();

    assert_eq!(suites.load_many(&ctx, "T3".to_owned()).await, Ok(vec![]));
    assert_eq!(suites.load_many(&ctx, "T3".to_owned()).await, Ok(vec![]));
    assert_eq!(batches.lock().len(), 1);
}

#[tokio::test]
async fn load_many_all_keeps_parent_order() {
    let ctx = CancellationToken::new();
    let (suites, _) = loader();

    assert_eq!(
        suites.load_many_all(&ctx, vec!["T2".to_owned(), "T9".to_owned(), "T1".to_owned()]).await,
        vec![Ok(vec![suite(3, "T2")]), Ok(vec![]), Ok(vec![suite(1, "T1"), suite(2, "T1")])]
    );
}

#[tokio::test]
async fn primed_children_replace_a_fetch_until_cleared() {
    let ctx = CancellationToken::new();
    let (suites, batches) = loader();

    suites.prime("T1".to_owned(), vec![suite(9, "T1")]).unwrap();
    assert_eq!(suites.load_many(&ctx, "T1".to_owned()).await, Ok(vec![suite(9, "T1")]));
    assert!(batches.lock().is_empty());

    suites.clear("T1".to_owned()).unwrap();
    assert_eq!(
        suites.load_many(&ctx, "T1".to_owned()).await,
        Ok(vec![suite(1, "T1"), suite(2, "T1")])
    );
    assert_eq!(batches.lock().len(), 1);
}
