//! Bounded worker group for the workergroup driver
//!
//! This crate provides [`WorkerGroup`], a lock-free wait group with a maximum
//! worker count. Callers count work in with `add`, out with `done`, and drain
//! with `wait`; `add` blocks while the group is full.
//!
//! # Primitives
//!
//! - [`WorkerGroup`] - Bounded counter with blocking admission and drain wait
//! - [`WorkerGuard`] - RAII guard releasing admitted workers on drop
//!
//! # Example
//!
//! ```rust,no_run
//! use worker_sync::WorkerGroup;
//! use std::sync::Arc;
//!
//! let group = Arc::new(WorkerGroup::with_max_workers(3));
//!
//! // Spawn many threads, but only 3 are counted at once
//! for i in 0..32 {
//!     group.add(1);
//!     let group = Arc::clone(&group);
//!     std::thread::spawn(move || {
//!         println!("Job {}", i);
//!         group.done();
//!     });
//! }
//! group.wait();
//! ```

pub mod config;
pub mod error;
pub mod parallelism;
mod worker_group;

pub use config::WorkerGroupConfig;
pub use error::{Result, WorkerGroupError};
pub use parallelism::default_parallelism;
pub use worker_group::{Capacity, WorkerGroup, WorkerGuard};
