use std::time::Duration;

use crate::error::ConfigError;

const WAIT_VAR: &str = "DATALOAD_WAIT_MS";
const MAX_BATCH_SIZE_VAR: &str = "DATALOAD_MAX_BATCH_SIZE";

/// Tuning for a loader's coalescing window.
///
/// A worker that receives its first uncached key waits at most `wait` for more keys to arrive, and
/// dispatches early once `max_batch_size` distinct keys are pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    pub wait: Duration,
    pub max_batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { wait: Duration::from_millis(2), max_batch_size: 100 }
    }
}

impl LoaderConfig {
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Sets the batch-capacity ceiling. Values below one are clamped to one.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Reads `DATALOAD_WAIT_MS` and `DATALOAD_MAX_BATCH_SIZE`, using the defaults for unset
    /// variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(WAIT_VAR) {
            config.wait = Duration::from_millis(parse_var(WAIT_VAR, &raw)?);
        }
        if let Some(raw) = lookup(MAX_BATCH_SIZE_VAR) {
            let size = parse_var(MAX_BATCH_SIZE_VAR, &raw)?;
            if size == 0 {
                return Err(ConfigError::InvalidVar {
                    var: MAX_BATCH_SIZE_VAR,
                    value: raw,
                    reason: "must be at least 1".to_owned(),
                });
            }
            config.max_batch_size = size as usize;
        }
        Ok(config)
    }
}

fn parse_var(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidVar {
        var,
        value: raw.to_owned(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn unset_vars_use_defaults() {
        assert_eq!(LoaderConfig::from_lookup(lookup(&[])).unwrap(), LoaderConfig::default());
    }

    #[test]
    fn reads_both_vars() {
        let config = LoaderConfig::from_lookup(lookup(&[
            ("DATALOAD_WAIT_MS", "15"),
            ("DATALOAD_MAX_BATCH_SIZE", " 250 "),
        ]))
        .unwrap();
        assert_eq!(config.wait, Duration::from_millis(15));
        assert_eq!(config.max_batch_size, 250);
    }

    #[test]
    fn rejects_zero_capacity_and_garbage() {
        assert!(LoaderConfig::from_lookup(lookup(&[("DATALOAD_MAX_BATCH_SIZE", "0")])).is_err());
        let err = LoaderConfig::from_lookup(lookup(&[("DATALOAD_WAIT_MS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("DATALOAD_WAIT_MS"));
    }

    #[test]
    fn builder_clamps_capacity() {
        assert_eq!(LoaderConfig::default().with_max_batch_size(0).max_batch_size, 1);
    }
}
