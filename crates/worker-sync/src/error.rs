//! Error types for the checked, timed and non-blocking worker group operations

use std::time::Duration;
use thiserror::Error;

/// Errors returned by the opt-in variants of [`WorkerGroup`](crate::WorkerGroup)
///
/// The core operations (`add`, `done`, `wait`, `max_workers`) never fail; they
/// either complete or block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerGroupError {
    /// The requested group can never fit under the current capacity
    #[error("cannot admit {delta} workers at once: max workers is {max_workers}")]
    ExceedsCapacity {
        /// Units requested in one admission
        delta: u32,
        /// Capacity at the time of the check
        max_workers: u32,
    },

    /// A release was attempted with no workers in flight
    #[error("worker count underflow: done() called with no workers in flight")]
    Underflow,

    /// The deadline passed before the operation could complete
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, WorkerGroupError>;
