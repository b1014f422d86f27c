use thiserror::Error;

/// Result delivered to every caller of [`crate::Loader::load`].
///
/// Errors are `Clone` because a single outcome is fanned out to every waiter on a key and, for
/// per-key errors, stored in the loader cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The batch function produced no entity for this key.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// The batch function failed for the whole batch.
    #[error("batch fetch failed: {0}")]
    Fetch(String),

    #[error("batch fetch panicked")]
    FetchPanicked,

    /// The batch function returned a result list that does not line up with its key list.
    #[error("batch fetch returned {got} results for {expected} keys")]
    ResultCount { expected: usize, got: usize },

    /// The caller's request context was cancelled before a result was delivered.
    #[error("load cancelled")]
    Cancelled,

    #[error("loader worker is no longer running")]
    WorkerGone,
}

impl LoadError {
    /// Returns true for errors that describe a failed dispatch rather than a specific key.
    ///
    /// These are never written to the loader cache, so a later load of the same key starts a
    /// fresh batch.
    pub fn is_batch_failure(&self) -> bool {
        matches!(
            self,
            LoadError::Fetch(_) | LoadError::FetchPanicked | LoadError::ResultCount { .. }
        )
    }

    /// Returns true for errors that describe the key itself and may be memoized like a value.
    ///
    /// Only [`LoadError::NotFound`] qualifies. Any other error a batch function places in a
    /// result slot is delivered to that slot's waiters but leaves the key uncached.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, LoadError::NotFound(_))
    }
}

/// Errors raised by a [`crate::store::Store`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable")]
    Unavailable,

    #[error("query failed: {0}")]
    Query(String),
}

impl From<StoreError> for LoadError {
    fn from(err: StoreError) -> Self {
        LoadError::Fetch(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidVar { var: &'static str, value: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_failures_are_distinguished_from_key_errors() {
        assert!(LoadError::Fetch("down".to_owned()).is_batch_failure());
        assert!(LoadError::FetchPanicked.is_batch_failure());
        assert!(LoadError::ResultCount { expected: 3, got: 2 }.is_batch_failure());
        assert!(!LoadError::NotFound("7".to_owned()).is_batch_failure());
        assert!(!LoadError::Cancelled.is_batch_failure());
    }

    #[test]
    fn only_not_found_is_cacheable() {
        assert!(LoadError::NotFound("7".to_owned()).is_cacheable());
        assert!(!LoadError::Fetch("down".to_owned()).is_cacheable());
        assert!(!LoadError::Cancelled.is_cacheable());
        assert!(!LoadError::WorkerGone.is_cacheable());
    }

    #[test]
    fn store_errors_become_fetch_failures() {
        let err: LoadError = StoreError::Unavailable.into();
        assert_eq!(err, LoadError::Fetch("store unavailable".to_owned()));
        assert_eq!(err.to_string(), "batch fetch failed: store unavailable");
    }
}
