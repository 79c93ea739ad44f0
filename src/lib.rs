//! workergroup: bounded worker groups and a load driver
//!
//! The [`worker_sync`] crate provides [`WorkerGroup`], a wait group with a
//! maximum worker count. This crate adds the command-line driver that pushes
//! synthetic jobs through a group on OS threads or compio tasks.

pub mod cli;
pub mod driver;
pub mod progress;

// Re-export commonly used types
pub use driver::{run, RunStats};
pub use worker_sync::{Capacity, WorkerGroup, WorkerGroupConfig, WorkerGroupError, WorkerGuard};
