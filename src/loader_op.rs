use std::slice;

use tokio::sync::oneshot;

use crate::error::LoadError;

/// Set of possible requests that can be sent to the [`crate::loader_worker::LoaderWorker`].
///
/// The three categories of commands are Load, Prime, and Clear. All of them travel through the
/// same queue, so a prime or clear is ordered with respect to the loads around it.
#[derive(Debug)]
pub enum LoaderOp<K, V> {
    /// Fetch data from the resource wrapped by this data loader (or the cache).
    Load(LoadRequest<K, V>),
    /// Add values to the cache that were fetched from elsewhere.
    Prime(K, V),
    PrimeMany(Vec<(K, V)>),
    /// Remove values from the cache so that they will be reloaded when they are next requested.
    Clear(K),
    ClearMany(Vec<K>),
    ClearAll,
}

/// A pending request: the requested key(s) and the sink their results are delivered to.
#[derive(Debug)]
pub enum LoadRequest<K, V> {
    One(K, oneshot::Sender<Result<V, LoadError>>),
    Many(Vec<K>, oneshot::Sender<Vec<Result<V, LoadError>>>),
}

impl<K, V> LoadRequest<K, V>
where
    V: Send + Clone + std::fmt::Debug,
{
    pub fn keys(&self) -> &[K] {
        match self {
            LoadRequest::One(ref key, _) => slice::from_ref(key),
            LoadRequest::Many(ref keys, _) => keys,
        }
    }

    /// Sends one result per requested key, in key order.
    ///
    /// A closed sink means the caller stopped waiting (usually a cancelled request), which is not
    /// an error for the loader.
    pub fn send_response<I>(self, results: I)
    where
        I: IntoIterator<Item = Result<V, LoadError>>,
    {
        match self {
            LoadRequest::One(_, response_tx) => {
                let response = results.into_iter().next().unwrap_or(Err(LoadError::WorkerGone));
                if response_tx.send(response).is_err() {
                    tracing::debug!("load receiver dropped");
                }
            }
            LoadRequest::Many(_, response_tx) => {
                let response = results.into_iter().collect::<Vec<_>>();
                if response_tx.send(response).is_err() {
                    tracing::debug!("load_all receiver dropped");
                }
            }
        }
    }
}
