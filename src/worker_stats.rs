#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Human readable name used to identify this worker stats when it is reported.
    tag: &'static str,
    /// Number of `LoaderOp::Load` that were received by the worker.
    load_requests: u32,
    /// The total number of keys that were requested for loading (not necessarily unique).
    items_requested: u32,
    /// The number of keys that were immediately found in the loader cache.
    cache_hits: u32,
    /// Number of times that this worker dispatched a batch.
    loads: u32,
    /// The average number of unique keys handed to the batch function per dispatch.
    average_batch_size: f32,
    /// The max number of unique keys fetched during a single dispatch.
    max_batch_size: u32,
    /// The min number of unique keys fetched during a single dispatch.
    min_batch_size: u32,
    /// The max number of waiting requests resolved by a single dispatch.
    max_waiters: u32,
    /// The total number of keys that resolved to a cached result.
    items_loaded: u32,
    /// Dispatches in which at least one batch fetch failed as a whole.
    failed_loads: u32,
}

impl WorkerStats {
    pub fn new(tag: &'static str) -> Self {
        Self { tag, min_batch_size: u32::MAX, ..Default::default() }
    }

    pub fn record_load_request(&mut self, items_requested: u32) {
        self.load_requests += 1;
        self.items_requested += items_requested;
    }

    pub fn record_cache_hits(&mut self, hits: u32) {
        self.cache_hits += hits;
    }

    pub fn record_load_exec(&mut self, unique_keys: u32, waiters: u32) {
        let new_total_load = self.loads + 1;
        self.average_batch_size = (((self.average_batch_size as f64 * self.loads as f64)
            + unique_keys as f64)
            / new_total_load as f64) as f32;
        self.loads = new_total_load;
        self.max_batch_size = self.max_batch_size.max(unique_keys);
        self.min_batch_size = self.min_batch_size.min(unique_keys);
        self.max_waiters = self.max_waiters.max(waiters);
    }

    pub fn record_load_exec_completed(&mut self, loaded_item_count: u32, failed: bool) {
        self.items_loaded += loaded_item_count;
        if failed {
            self.failed_loads += 1;
        }
    }
}

impl Drop for WorkerStats {
    fn drop(&mut self) {
        tracing::debug!(worker_stats = ?self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_batch_extremes() {
        let mut stats = WorkerStats::new("test");
        stats.record_load_request(3);
        stats.record_cache_hits(1);
        stats.record_load_exec(2, 2);
        stats.record_load_exec_completed(2, false);
        stats.record_load_exec(4, 1);
        stats.record_load_exec_completed(0, true);

        assert_eq!(stats.loads, 2);
        assert_eq!(stats.min_batch_size, 2);
        assert_eq!(stats.max_batch_size, 4);
        assert_eq!(stats.max_waiters, 2);
        assert_eq!(stats.average_batch_size, 3.0);
        assert_eq!(stats.items_loaded, 2);
        assert_eq!(stats.failed_loads, 1);
        assert_eq!(stats.tag, "test");
    }
}
