use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::slice;
use std::sync::Arc;

use futures::future::{self, FutureExt};
use indexmap::IndexSet;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{span, Level};
use tracing_futures::Instrument;

use crate::{
    batch_function::{BatchFunction, BatchResult},
    cache::Cache,
    config::LoaderConfig,
    error::LoadError,
    loader_op::{LoadRequest, LoaderOp},
};

#[cfg(feature = "stats")]
use crate::worker_stats::WorkerStats;

/// A `LoaderWorker` is the "single-thread" worker task that actually does the loading work.
///
/// Once started, it runs in a loop until the parent Loader aborts its `JoinHandle` or drops the
/// request queue tx channel. The worker exclusively owns the cache and the pending batch, so every
/// state transition happens on this one task and no locking is needed.
///
/// The worker can be in one of three states during its lifetime:
///
/// 1. Idle: waiting for requests.
/// 2. Collecting: staging uncached keys for loading.
/// 3. Dispatching: executing its `BatchFunction`.
///
/// One cycle through this loop may be called an "execution frame".
///
/// In state (1), the worker awaits any message on the request queue. Prime and Clear requests are
/// applied to the cache immediately, and Load requests that are fully cached are answered
/// immediately; neither leaves the Idle state.
///
/// The first Load request with an uncached key moves the worker to state (2). The worker keeps
/// pulling requests from the queue, deduplicating their uncached keys in order of first appearance,
/// until either the configured wait window elapses or the number of distinct pending keys reaches
/// the configured batch capacity.
///
/// In state (3), the loader invokes its `BatchFunction` with the keys it collected and keeps
/// serving the queue while the fetch runs. Cache hits, primes and clears are handled at once. Keys
/// that are part of the running batch attach their request to it; any other uncached key is staged
/// for the next frame, since the running batch is closed. Once the fetch returns, per-key results
/// are written to the cache and every request whose keys are all settled is answered. When the
/// batch fails as a whole (an `Err`, a panic, or a result list of the wrong length), the error is
/// delivered to the waiters of that batch and nothing is cached, so a later load retries.
pub struct LoaderWorker<K, V, F, CacheT, ContextT>
where
    K: 'static + Eq + Hash + Debug + Clone + Send + Sync,
    V: 'static + Send + Debug + Clone,
    F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    CacheT: Cache<K = K, V = Result<V, LoadError>>,
    ContextT: Send + Sync + 'static,
{
    cache: CacheT,
    request_rx: mpsc::UnboundedReceiver<LoaderOp<K, V>>,
    keys_to_load: IndexSet<K>,
    in_flight: HashSet<K>,
    pending_requests: Vec<LoadRequest<K, V>>,
    context: Arc<ContextT>,
    config: LoaderConfig,
    phantom_batch_function: PhantomData<F>,
    debug_name: &'static str,
    #[cfg(feature = "stats")]
    stats: WorkerStats,
}

impl<K, V, F, CacheT, ContextT> LoaderWorker<K, V, F, CacheT, ContextT>
where
    K: 'static + Eq + Hash + Debug + Clone + Send + Sync,
    V: 'static + Send + Debug + Clone,
    F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    CacheT: Cache<K = K, V = Result<V, LoadError>> + Send + 'static,
    ContextT: Send + Sync + 'static,
{
    pub fn new(
        cache: CacheT,
        request_rx: mpsc::UnboundedReceiver<LoaderOp<K, V>>,
        context: ContextT,
        config: LoaderConfig,
    ) -> Self {
        let debug_name = std::any::type_name::<(K, V)>();
        Self {
            cache,
            request_rx,
            keys_to_load: IndexSet::new(),
            in_flight: HashSet::new(),
            pending_requests: Vec::new(),
            context: Arc::new(context),
            config,
            phantom_batch_function: PhantomData,
            debug_name,
            #[cfg(feature = "stats")]
            stats: WorkerStats::new(debug_name),
        }
    }

    /// Spawns the worker loop on the current tokio runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        let span = span!(Level::TRACE, "LoaderWorker", kv = self.debug_name);
        tokio::task::spawn(self.start().instrument(span))
    }

    async fn start(mut self) {
        loop {
            // Requests staged during the last dispatch start the next frame right away.
            if self.pending_requests.is_empty() {
                match self.request_rx.recv().await {
                    None => {
                        tracing::info!("Tx channel closed. Terminating LoaderWorker.");
                        return;
                    }
                    Some(op) => self.mux_op(op),
                }
                continue;
            }
            self.collect().await;
            self.execute_load().await;
        }
    }

    /// Gathers further ops until the wait window closes or the batch is full.
    async fn collect(&mut self) {
        let deadline = Instant::now() + self.config.wait;
        let window = tokio::time::sleep_until(deadline);
        tokio::pin!(window);

        while self.keys_to_load.len() < self.config.max_batch_size && Instant::now() < deadline {
            tokio::select! {
                biased;
                op = self.request_rx.recv() => match op {
                    Some(op) => self.mux_op(op),
                    None => break,
                },
                _ = &mut window => break,
            }
        }
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn mux_op(&mut self, op: LoaderOp<K, V>) {
        match op {
            LoaderOp::Load(request) => {
                let missing = request
                    .keys()
                    .iter()
                    .filter(|k| !self.cache.contains(k))
                    .cloned()
                    .collect::<Vec<_>>();
                #[cfg(feature = "stats")]
                {
                    let requested = request.keys().len() as u32;
                    self.stats.record_load_request(requested);
                    self.stats.record_cache_hits(requested - missing.len() as u32);
                }
                if missing.is_empty() {
                    tracing::debug!(requested_keys = ?request.keys(), "served from cache");
                    let results = self.resolve(request.keys(), &HashMap::new());
                    request.send_response(results);
                    return;
                }
                // Keys already in the running batch wait for it instead of being fetched twice.
                let keys_to_load = missing
                    .into_iter()
                    .filter(|k| !self.in_flight.contains(k))
                    .collect::<Vec<_>>();
                tracing::debug!(requested_keys = ?request.keys(), ?keys_to_load);
                self.keys_to_load.extend(keys_to_load);
                self.pending_requests.push(request);
            }
            LoaderOp::Prime(key, value) => self.cache.insert(key, Ok(value)),
            LoaderOp::PrimeMany(key_vals) => {
                self.cache.insert_many(key_vals.into_iter().map(|(k, v)| (k, Ok(v))))
            }
            LoaderOp::Clear(key) => self.cache.remove(slice::from_ref(&key)),
            LoaderOp::ClearMany(keys) => self.cache.remove(&keys),
            LoaderOp::ClearAll => self.cache.flush(),
        }
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn execute_load(&mut self) {
        // A clear that arrived while collecting may have evicted a key a pending request was
        // going to read from the cache, and a prime may have satisfied a staged key.
        for request in &self.pending_requests {
            for key in request.keys() {
                if !self.cache.contains(key) {
                    self.keys_to_load.insert(key.clone());
                }
            }
        }
        self.keys_to_load.retain(|k| !self.cache.contains(k));

        let keys = self.keys_to_load.drain(..).collect::<Vec<_>>();
        self.in_flight.extend(keys.iter().cloned());
        tracing::debug!(
            batch_size = keys.len(),
            waiters = self.pending_requests.len(),
            "dispatching batch"
        );
        #[cfg(feature = "stats")]
        self.stats.record_load_exec(keys.len() as u32, self.pending_requests.len() as u32);

        let capacity = self.config.max_batch_size.max(1);
        let chunks = keys.chunks(capacity).map(<[K]>::to_vec).collect::<Vec<_>>();
        let context = Arc::clone(&self.context);
        let dispatch = async move {
            let outcomes =
                future::join_all(chunks.iter().map(|chunk| fetch::<K, V, F>(chunk, &context)))
                    .await;
            chunks.into_iter().zip(outcomes).collect::<Vec<_>>()
        };
        tokio::pin!(dispatch);

        let mut open = true;
        let outcomes = loop {
            tokio::select! {
                biased;
                outcomes = &mut dispatch => break outcomes,
                op = self.request_rx.recv(), if open => match op {
                    Some(op) => self.mux_op(op),
                    None => open = false,
                },
            }
        };
        self.in_flight.clear();

        let mut failures = HashMap::new();
        for (chunk, outcome) in outcomes {
            match outcome {
                Ok(results) => {
                    for (key, result) in chunk.into_iter().zip(results) {
                        match result {
                            Err(err) if !err.is_cacheable() => {
                                failures.insert(key, err);
                            }
                            result => self.cache.insert(key, result),
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, keys = ?chunk, "batch fetch failed");
                    failures.extend(chunk.into_iter().map(|k| (k, err.clone())));
                }
            }
        }
        #[cfg(feature = "stats")]
        self.stats
            .record_load_exec_completed((keys.len() - failures.len()) as u32, !failures.is_empty());

        // Requests that arrived during the dispatch with keys staged for the next frame stay
        // pending; everything else has all its keys settled now.
        let (ready, staged): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending_requests).into_iter().partition(|request| {
                request
                    .keys()
                    .iter()
                    .all(|k| self.cache.contains(k) || failures.contains_key(k))
            });
        self.pending_requests = staged;
        for request in ready {
            let results = self.resolve(request.keys(), &failures);
            request.send_response(results);
        }
    }

    fn resolve(&self, keys: &[K], failures: &HashMap<K, LoadError>) -> Vec<Result<V, LoadError>> {
        keys.iter()
            .map(|k| match self.cache.get(k) {
                Some(result) => result.clone(),
                None => Err(failures.get(k).cloned().unwrap_or(LoadError::WorkerGone)),
            })
            .collect()
    }
}

/// Runs the batch function for one chunk of keys and enforces its length contract.
async fn fetch<K, V, F>(keys: &[K], context: &F::Context) -> BatchResult<V>
where
    F: BatchFunction<K, V>,
{
    let results = match AssertUnwindSafe(F::load(keys, context)).catch_unwind().await {
        Ok(outcome) => outcome?,
        Err(_) => return Err(LoadError::FetchPanicked),
    };
    if results.len() != keys.len() {
        return Err(LoadError::ResultCount { expected: keys.len(), got: results.len() });
    }
    Ok(results)
}
