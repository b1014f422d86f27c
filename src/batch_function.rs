use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use async_trait::async_trait;

use crate::error::LoadError;

/// Outcome of one batch fetch: either one result per requested key, or a single error for the
/// whole batch.
pub type BatchResult<V> = Result<Vec<Result<V, LoadError>>, LoadError>;

/// A `BatchFunction` defines the method through which some `Loader` may fetch batched data from
/// some resource. The `BatchFunction` receives the distinct keys gathered during the `Loader`'s
/// most recent coalescing window, in order of first appearance, and some user defined context
/// struct (typically a store handle).
///
/// The returned list must have exactly one entry per key, in the same order as `keys`. A
/// [`LoadError::NotFound`] slot is cached like a value; any other error in a slot reaches that
/// key's waiters without being cached. Returning `Err` fails every waiter in the batch and leaves
/// the cache untouched so that the keys can be retried.
///
/// Multiple `BatchFunctions` (and therefore loaders) can share the same context (likely through an
/// `Arc`).
#[async_trait]
pub trait BatchFunction<K, V> {
    type Context;
    async fn load(keys: &[K], context: &Self::Context) -> BatchResult<V>;
}

/// Lines `rows` up with `keys`, yielding [`LoadError::NotFound`] for every key no row matched.
pub fn match_keys<K, V, F>(keys: &[K], rows: Vec<V>, key_of: F) -> Vec<Result<V, LoadError>>
where
    K: Eq + Hash + Display,
    V: Clone,
    F: Fn(&V) -> K,
{
    let by_key = rows.into_iter().map(|row| (key_of(&row), row)).collect::<HashMap<_, _>>();
    keys.iter()
        .map(|k| by_key.get(k).cloned().ok_or_else(|| LoadError::NotFound(k.to_string())))
        .collect()
}

/// Groups `children` by their parent key and emits one list per requested key.
///
/// Children keep the order in which they were fetched. Parents without children get an empty
/// list, never an error.
pub fn group_by_key<K, C, F>(
    keys: &[K],
    children: Vec<C>,
    parent_of: F,
) -> Vec<Result<Vec<C>, LoadError>>
where
    K: Eq + Hash,
    C: Clone,
    F: Fn(&C) -> K,
{
    let mut groups: HashMap<K, Vec<C>> = HashMap::new();
    for child in children {
        groups.entry(parent_of(&child)).or_default().push(child);
    }
    keys.iter().map(|k| Ok(groups.get(k).cloned().unwrap_or_default())).collect()
}

/// Two-hop variant of [`group_by_key`]: `links` are `(parent, far)` association rows and `far_rows`
/// the far-side entities fetched once for all distinct far keys.
///
/// Each parent's list follows the order of its association rows. Associations whose far row is
/// missing are skipped.
pub fn group_through<K, J, T, F>(
    keys: &[K],
    links: &[(K, J)],
    far_rows: Vec<T>,
    far_key_of: F,
) -> Vec<Result<Vec<T>, LoadError>>
where
    K: Eq + Hash,
    J: Eq + Hash,
    T: Clone,
    F: Fn(&T) -> J,
{
    let far = far_rows.into_iter().map(|row| (far_key_of(&row), row)).collect::<HashMap<_, _>>();
    let mut groups: HashMap<&K, Vec<T>> = HashMap::new();
    for (parent, far_key) in links {
        let entry = groups.entry(parent).or_default();
        if let Some(row) = far.get(far_key) {
            entry.push(row.clone());
        }
    }
    keys.iter().map(|k| Ok(groups.get(k).cloned().unwrap_or_default())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Suite {
        id: u32,
        run: &'static str,
    }

    fn keys(ks: &[&str]) -> Vec<String> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn match_keys_isolates_missing() {
        let rows = vec![(12, "twelve"), (10, "ten")];
        let out = match_keys(&[10, 99, 12], rows, |(k, _)| *k);
        assert_eq!(
            out,
            vec![Ok((10, "ten")), Err(LoadError::NotFound("99".to_owned())), Ok((12, "twelve"))]
        );
    }

    #[test]
    fn group_by_key_keeps_fetch_order_and_fills_empty() {
        let children = vec![
            Suite { id: 1, run: "T1" },
            Suite { id: 3, run: "T2" },
            Suite { id: 2, run: "T1" },
        ];
        let out = group_by_key(&keys(&["T1", "T2", "T3"]), children, |s| s.run.to_owned());
        assert_eq!(
            out,
            vec![
                Ok(vec![Suite { id: 1, run: "T1" }, Suite { id: 2, run: "T1" }]),
                Ok(vec![Suite { id: 3, run: "T2" }]),
                Ok(vec![]),
            ]
        );
    }

    #[test]
    fn group_through_walks_links() {
        let links = vec![
            ("r1".to_owned(), 7),
            ("r2".to_owned(), 7),
            ("r1".to_owned(), 9),
            ("r2".to_owned(), 404),
        ];
        let tags = vec![(9, "flaky"), (7, "nightly")];
        let out = group_through(&keys(&["r1", "r2", "r3"]), &links, tags, |(id, _)| *id);
        assert_eq!(
            out,
            vec![
                Ok(vec![(7, "nightly"), (9, "flaky")]),
                Ok(vec![(7, "nightly")]),
                Ok(vec![]),
            ]
        );
    }
}
