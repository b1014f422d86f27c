use std::fmt::Debug;
use std::hash::Hash;

use tokio_util::sync::CancellationToken;

use crate::{batch_function::BatchFunction, config::LoaderConfig, error::LoadError, loader::Loader};

/// One-to-many loader: resolves a parent key to the ordered list of its children.
///
/// This is a [`Loader`] whose value type is `Vec<C>`, so it shares the coalescing, dispatch and
/// caching behaviour. Its batch function is expected to fetch every child of the requested
/// parents in one go and group them with [`crate::group_by_key`] or [`crate::group_through`],
/// which yield an empty list for parents that have no children.
pub struct RelationshipLoader<K, C>
where
    K: 'static + Eq + Debug + Clone + Send,
    C: 'static + Send + Debug + Clone,
{
    inner: Loader<K, Vec<C>>,
}

impl<K, C> RelationshipLoader<K, C>
where
    K: 'static + Eq + Debug + Clone + Hash + Send + Sync,
    C: 'static + Send + Debug + Clone,
{
    pub fn new<F, ContextT>(batch_fn: F, context: ContextT) -> Self
    where
        ContextT: Send + Sync + 'static,
        F: 'static + BatchFunction<K, Vec<C>, Context = ContextT> + Send,
    {
        Self { inner: Loader::new(batch_fn, context) }
    }

    pub fn with_config<F, ContextT>(batch_fn: F, context: ContextT, config: LoaderConfig) -> Self
    where
        ContextT: Send + Sync + 'static,
        F: 'static + BatchFunction<K, Vec<C>, Context = ContextT> + Send,
    {
        Self { inner: Loader::with_config(batch_fn, context, config) }
    }

    /// Loads the children of `parent_key`. A parent without children yields an empty list.
    pub async fn load_many(
        &self,
        ctx: &CancellationToken,
        parent_key: K,
    ) -> Result<Vec<C>, LoadError> {
        self.inner.load(ctx, parent_key).await
    }

    /// Loads the children of several parents, one list per parent in the order given.
    pub async fn load_many_all(
        &self,
        ctx: &CancellationToken,
        parent_keys: Vec<K>,
    ) -> Vec<Result<Vec<C>, LoadError>> {
        self.inner.load_all(ctx, parent_keys).await
    }

    /// Seeds the cached child list of a parent, e.g. after a mutation created its children.
    pub fn prime(&self, parent_key: K, children: Vec<C>) -> Result<(), LoadError> {
        self.inner.prime(parent_key, children)
    }

    pub fn clear(&self, parent_key: K) -> Result<(), LoadError> {
        self.inner.clear(parent_key)
    }

    pub fn clear_all(&self) -> Result<(), LoadError> {
        self.inner.clear_all()
    }
}
