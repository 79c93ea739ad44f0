//! Worker group configuration

use crate::error::{Result, WorkerGroupError};
use std::time::Duration;

/// Interval between re-checks while `add` or `wait` is blocked
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_nanos(10);

/// Shortest sleep used by the async variants between re-checks
///
/// compio completes a timer whose deadline has already passed without
/// suspending, so a shorter async sleep would never yield to the runtime.
pub const MIN_ASYNC_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound on the poll interval accepted by [`WorkerGroupConfig::validate`]
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Construction-time settings for a [`WorkerGroup`](crate::WorkerGroup)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerGroupConfig {
    /// Initial max workers; 0 leaves it unset so the first admission resolves
    /// it to the host parallelism
    pub max_workers: u32,
    /// Sleep between re-checks of a blocked admission or drain
    pub poll_interval: Duration,
}

impl Default for WorkerGroupConfig {
    fn default() -> Self {
        Self {
            max_workers: 0,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WorkerGroupConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`WorkerGroupError::InvalidConfig`] if the poll interval is
    /// longer than [`MAX_POLL_INTERVAL`]
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval > MAX_POLL_INTERVAL {
            return Err(WorkerGroupError::InvalidConfig(format!(
                "poll interval must be at most {MAX_POLL_INTERVAL:?}, got {:?}",
                self.poll_interval
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorkerGroupConfig::default();
        assert_eq!(config.max_workers, 0);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_interval_too_long() {
        let config = WorkerGroupConfig {
            max_workers: 4,
            poll_interval: Duration::from_secs(2),
        };
        assert!(matches!(
            config.validate(),
            Err(WorkerGroupError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_poll_interval_at_bound() {
        let config = WorkerGroupConfig {
            max_workers: 1,
            poll_interval: MAX_POLL_INTERVAL,
        };
        assert!(config.validate().is_ok());
    }
}
