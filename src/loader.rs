use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Drop;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::{
    batch_function::BatchFunction,
    config::LoaderConfig,
    error::LoadError,
    loader_op::{LoadRequest, LoaderOp},
    loader_worker::LoaderWorker,
};

/// Batch loads values from some expensive resource, primarily intended for mitigating GraphQL's
/// N+1 problem.
///
/// Users can call [`Loader::load`] and [`Loader::load_all`] to fetch values from the underlying
/// resource or cache. The cache can be cleared with calls to [`Loader::clear`],
/// [`Loader::clear_many`] and [`Loader::clear_all`], and values can be added to the cache
/// out-of-band through the use of [`Loader::prime`] and [`Loader::prime_many`].
///
/// The `Loader` struct acts as an intermediary between the async domain in which `load` calls are
/// invoked and the pseudo-single-threaded domain of the `LoaderWorker`. Callers can invoke the
/// `Loader` from multiple parallel tasks, and the loader will enqueue the requested operations on
/// the request queue for processing by its `LoaderWorker`. The worker processes the requests
/// sequentially and provides results via response oneshot channels back to the Loader.
///
/// A `Loader` caches everything it resolves for as long as it lives and is meant to be built per
/// request (see [`crate::Loaders`]). Dropping it stops the worker.
pub struct Loader<K, V>
where
    K: 'static + Eq + Debug + Clone + Send,
    V: 'static + Send + Debug + Clone,
{
    request_tx: mpsc::UnboundedSender<LoaderOp<K, V>>,
    load_task_handle: tokio::task::JoinHandle<()>,
}

impl<K, V> Drop for Loader<K, V>
where
    K: 'static + Eq + Debug + Clone + Send,
    V: 'static + Send + Debug + Clone,
{
    fn drop(&mut self) {
        self.load_task_handle.abort();
    }
}

impl<K, V> Loader<K, V>
where
    K: 'static + Eq + Debug + Clone + Hash + Send + Sync,
    V: 'static + Send + Debug + Clone,
{
    /// Creates a new Loader for the provided BatchFunction and Context type, using the default
    /// [`LoaderConfig`].
    ///
    /// Note: the batch function is passed in as a marker for type inference. Must be called from
    /// within a tokio runtime.
    pub fn new<F, ContextT>(batch_fn: F, context: ContextT) -> Self
    where
        ContextT: Send + Sync + 'static,
        F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    {
        Self::with_config(batch_fn, context, LoaderConfig::default())
    }

    pub fn with_config<F, ContextT>(_: F, context: ContextT, config: LoaderConfig) -> Self
    where
        ContextT: Send + Sync + 'static,
        F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = LoaderWorker::<K, V, F, HashMap<K, Result<V, LoadError>>, ContextT>::new(
            HashMap::new(),
            rx,
            context,
            config,
        );
        Self { request_tx: tx, load_task_handle: worker.spawn() }
    }
}

impl<K, V> Loader<K, V>
where
    K: 'static + Eq + Debug + Clone + Send + Sync,
    V: 'static + Send + Debug + Clone,
{
    /// Loads a value from the underlying resource.
    ///
    /// If the key is already in the loader cache (as a value or as a per-key error), the cached
    /// result is returned as soon as the request is processed. Otherwise, the key is enqueued for
    /// batch loading in the next loader execution frame.
    ///
    /// Cancelling `ctx` stops this caller from waiting and yields [`LoadError::Cancelled`]; other
    /// callers waiting on the same key are unaffected.
    pub async fn load(&self, ctx: &CancellationToken, key: K) -> Result<V, LoadError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.submit(ctx, LoadRequest::One(key, response_tx))?;
        tokio::select! {
            biased;
            response = response_rx => response.unwrap_or(Err(LoadError::WorkerGone)),
            _ = ctx.cancelled() => Err(LoadError::Cancelled),
        }
    }

    /// Loads many values at once, returning one result per key in the order given.
    ///
    /// The keys share the coalescing window and cache with concurrent [`Loader::load`] calls.
    pub async fn load_all(
        &self,
        ctx: &CancellationToken,
        keys: Vec<K>,
    ) -> Vec<Result<V, LoadError>> {
        let key_count = keys.len();
        let (response_tx, response_rx) = oneshot::channel();
        if let Err(err) = self.submit(ctx, LoadRequest::Many(keys, response_tx)) {
            return vec![Err(err); key_count];
        }
        tokio::select! {
            biased;
            response = response_rx => {
                response.unwrap_or_else(|_| vec![Err(LoadError::WorkerGone); key_count])
            }
            _ = ctx.cancelled() => vec![Err(LoadError::Cancelled); key_count],
        }
    }

    fn submit(&self, ctx: &CancellationToken, request: LoadRequest<K, V>) -> Result<(), LoadError> {
        if ctx.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        self.send(LoaderOp::Load(request))
    }

    /// Adds a value to the cache.
    pub fn prime(&self, key: K, value: V) -> Result<(), LoadError> {
        self.send(LoaderOp::Prime(key, value))
    }

    /// Adds many values to the cache at once.
    pub fn prime_many(&self, key_vals: Vec<(K, V)>) -> Result<(), LoadError> {
        self.send(LoaderOp::PrimeMany(key_vals))
    }

    /// Removes a value from the cache.
    ///
    /// This key will be reloaded when it is next requested.
    pub fn clear(&self, key: K) -> Result<(), LoadError> {
        self.send(LoaderOp::Clear(key))
    }

    /// Removes multiple values from the cache at once.
    pub fn clear_many(&self, keys: Vec<K>) -> Result<(), LoadError> {
        self.send(LoaderOp::ClearMany(keys))
    }

    pub fn clear_all(&self) -> Result<(), LoadError> {
        self.send(LoaderOp::ClearAll)
    }

    fn send(&self, op: LoaderOp<K, V>) -> Result<(), LoadError> {
        self.request_tx.send(op).map_err(|_| LoadError::WorkerGone)
    }
}
