//! Bounded worker group
//!
//! A [`WorkerGroup`] behaves like a wait group with a ceiling: callers count
//! workers in with [`WorkerGroup::add`], out with [`WorkerGroup::done`], and
//! anyone may block in [`WorkerGroup::wait`] until the count drains to zero.
//! `add` blocks while admitting the requested workers would push the count past
//! the configured maximum, so the same structure doubles as a throttle.
//!
//! # Design
//!
//! - **Two atomics, no lock**: `max_workers` and `workers` are plain `AtomicU32`s
//! - **Lazy default**: a max of 0 means "unset" and is resolved to the host
//!   parallelism by the first caller that needs it (compare-and-swap, first
//!   writer wins)
//! - **Polling**: blocked callers sleep for a fixed short interval and re-check;
//!   there is no waiter queue and no fairness between blocked admitters
//! - **Group admission**: `add(n)` either counts all `n` workers or none
//!
//! # Example
//!
//! ```rust,no_run
//! use worker_sync::WorkerGroup;
//!
//! static GROUP: WorkerGroup = WorkerGroup::new();
//!
//! GROUP.max_workers(4);
//! for i in 0..32 {
//!     GROUP.add(1);
//!     std::thread::spawn(move || {
//!         println!("job {i}");
//!         GROUP.done();
//!     });
//! }
//! GROUP.wait();
//! ```

use crate::config::{WorkerGroupConfig, DEFAULT_POLL_INTERVAL, MIN_ASYNC_POLL_INTERVAL};
use crate::error::{Result, WorkerGroupError};
use crate::parallelism::default_parallelism;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// A wait group that caps how many workers may be counted at once
///
/// Share it by reference, through an `Arc`, or as a `static`
/// ([`WorkerGroup::new`] is `const`).
pub struct WorkerGroup {
    /// Max simultaneous workers; 0 until resolved
    max_workers: AtomicU32,
    /// Workers admitted and not yet released
    workers: AtomicU32,
    /// Sleep between re-checks while blocked
    poll_interval: Duration,
}

/// Snapshot of the capacity field, without triggering default resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// No max has been set or resolved yet
    Unresolved,
    /// Max workers in effect
    Resolved(NonZeroU32),
}

/// Outcome of a single check-then-commit attempt
enum Admission {
    Admitted,
    Full,
    Raced,
}

impl WorkerGroup {
    /// Create a group with an unset max and the default poll interval
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_workers: AtomicU32::new(0),
            workers: AtomicU32::new(0),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Create a group with the given max workers (0 leaves it unset)
    ///
    /// # Example
    ///
    /// ```rust
    /// use worker_sync::WorkerGroup;
    ///
    /// let group = WorkerGroup::with_max_workers(3);
    /// assert_eq!(group.max_workers(0), 3);
    /// ```
    #[must_use]
    pub const fn with_max_workers(max_workers: u32) -> Self {
        Self {
            max_workers: AtomicU32::new(max_workers),
            workers: AtomicU32::new(0),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Create a group from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`WorkerGroupError::InvalidConfig`] if the configuration fails
    /// validation
    pub fn from_config(config: &WorkerGroupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            max_workers: AtomicU32::new(config.max_workers),
            workers: AtomicU32::new(0),
            poll_interval: config.poll_interval,
        })
    }

    /// Set max workers, or resolve and report it
    ///
    /// A non-zero `requested` overwrites the current max unconditionally and is
    /// returned as is. Zero changes nothing except that an unset max is resolved
    /// to the host parallelism; the max in effect is returned. An explicit max of
    /// zero is therefore not expressible.
    ///
    /// # Example
    ///
    /// ```rust
    /// use worker_sync::WorkerGroup;
    ///
    /// let group = WorkerGroup::new();
    /// assert_eq!(group.max_workers(0), worker_sync::default_parallelism());
    /// assert_eq!(group.max_workers(8), 8);
    /// assert_eq!(group.max_workers(0), 8);
    /// ```
    pub fn max_workers(&self, requested: u32) -> u32 {
        if requested == 0 {
            return self.resolve_max_workers();
        }
        self.max_workers.store(requested, Ordering::Release);
        requested
    }

    /// Current capacity without resolving the default
    #[must_use]
    pub fn capacity(&self) -> Capacity {
        NonZeroU32::new(self.max_workers.load(Ordering::Acquire))
            .map_or(Capacity::Unresolved, Capacity::Resolved)
    }

    /// Number of workers currently counted
    ///
    /// Useful for monitoring; the value may change immediately after reading.
    #[must_use]
    pub fn workers(&self) -> u32 {
        self.workers.load(Ordering::Acquire)
    }

    /// Interval blocked callers sleep between re-checks
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Count `delta` more workers, blocking while they would exceed the max
    ///
    /// The `delta` workers are admitted together or not at all. Both the count
    /// and the max are re-read on every poll. There is no timeout: a `delta`
    /// larger than the max blocks until the max is raised.
    pub fn add(&self, delta: u32) {
        loop {
            match self.try_admit_once(delta) {
                Admission::Admitted => return,
                Admission::Raced => {}
                Admission::Full => thread::sleep(self.poll_interval),
            }
        }
    }

    /// Count `delta` more workers only if they fit right now
    ///
    /// Returns `false` without blocking if the group is full. Losing a race to
    /// another admission or release is retried, not reported.
    ///
    /// # Example
    ///
    /// ```rust
    /// use worker_sync::WorkerGroup;
    ///
    /// let group = WorkerGroup::with_max_workers(1);
    /// assert!(group.try_add(1));
    /// assert!(!group.try_add(1));
    /// group.done();
    /// assert!(group.try_add(1));
    /// ```
    #[must_use]
    pub fn try_add(&self, delta: u32) -> bool {
        loop {
            match self.try_admit_once(delta) {
                Admission::Admitted => return true,
                Admission::Full => return false,
                Admission::Raced => {}
            }
        }
    }

    /// Like [`add`](Self::add), but give up once `timeout` has elapsed
    ///
    /// # Errors
    ///
    /// Returns [`WorkerGroupError::Timeout`] if `delta` workers could not be
    /// admitted before the deadline; nothing is counted in that case
    pub fn add_timeout(&self, delta: u32, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.try_admit_once(delta) {
                Admission::Admitted => return Ok(()),
                Admission::Raced => {}
                Admission::Full => {
                    if Instant::now() >= deadline {
                        return Err(WorkerGroupError::Timeout(timeout));
                    }
                    thread::sleep(self.poll_interval);
                }
            }
        }
    }

    /// Like [`add`](Self::add), but refuse a `delta` that exceeds the max
    ///
    /// The check is made against the max at call time; lowering the max
    /// concurrently can still leave the caller blocked.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerGroupError::ExceedsCapacity`] if `delta` is larger than
    /// the current max workers
    pub fn add_checked(&self, delta: u32) -> Result<()> {
        let max_workers = self.resolve_max_workers();
        if delta > max_workers {
            return Err(WorkerGroupError::ExceedsCapacity { delta, max_workers });
        }
        self.add(delta);
        Ok(())
    }

    /// Count `delta` workers and release them all when the guard drops
    ///
    /// # Example
    ///
    /// ```rust
    /// use worker_sync::WorkerGroup;
    ///
    /// let group = WorkerGroup::with_max_workers(4);
    /// {
    ///     let _guard = group.guard(2);
    ///     assert_eq!(group.workers(), 2);
    /// }
    /// assert_eq!(group.workers(), 0);
    /// ```
    pub fn guard(&self, delta: u32) -> WorkerGuard<'_> {
        self.add(delta);
        WorkerGuard {
            group: self,
            count: delta,
        }
    }

    /// Release one worker
    ///
    /// Unchecked: every admitted unit must be released exactly once. Releasing
    /// more than was admitted wraps the count and leaves [`wait`](Self::wait)
    /// blocked.
    pub fn done(&self) {
        self.workers.fetch_sub(1, Ordering::AcqRel);
    }

    /// Release one worker, refusing to go below zero
    ///
    /// # Errors
    ///
    /// Returns [`WorkerGroupError::Underflow`] if no workers are counted
    pub fn checked_done(&self) -> Result<()> {
        self.workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            })
            .map(|_| ())
            .map_err(|_| WorkerGroupError::Underflow)
    }

    /// Block until the worker count is observed to be zero
    ///
    /// New admissions may race in right after this returns.
    pub fn wait(&self) {
        while self.workers() != 0 {
            thread::sleep(self.poll_interval);
        }
    }

    /// Like [`wait`](Self::wait), but give up once `timeout` has elapsed
    ///
    /// # Errors
    ///
    /// Returns [`WorkerGroupError::Timeout`] if the count did not reach zero
    /// before the deadline
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while self.workers() != 0 {
            if Instant::now() >= deadline {
                return Err(WorkerGroupError::Timeout(timeout));
            }
            thread::sleep(self.poll_interval);
        }
        Ok(())
    }

    /// Async [`add`](Self::add): yields to the compio runtime between polls
    ///
    /// Sleeps at least [`MIN_ASYNC_POLL_INTERVAL`] between re-checks so that
    /// other tasks on the same runtime (including the one that will call
    /// `done`) get to run. Dropping the future before it returns leaves nothing
    /// counted.
    pub async fn add_async(&self, delta: u32) {
        loop {
            match self.try_admit_once(delta) {
                Admission::Admitted => return,
                Admission::Raced => {}
                Admission::Full => compio::time::sleep(self.async_poll_interval()).await,
            }
        }
    }

    /// Async [`wait`](Self::wait): yields to the compio runtime between polls
    ///
    /// Uses the same sleep floor as [`add_async`](Self::add_async).
    pub async fn wait_async(&self) {
        while self.workers() != 0 {
            compio::time::sleep(self.async_poll_interval()).await;
        }
    }

    fn async_poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_ASYNC_POLL_INTERVAL)
    }

    /// Replace an unset max with the host parallelism; returns the max in effect
    fn resolve_max_workers(&self) -> u32 {
        let current = self.max_workers.load(Ordering::Acquire);
        if current != 0 {
            return current;
        }

        let hint = default_parallelism();
        match self
            .max_workers
            .compare_exchange(0, hint, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                debug!("Resolved default max workers to {}", hint);
                hint
            }
            Err(current) => current,
        }
    }

    fn try_admit_once(&self, delta: u32) -> Admission {
        let max_workers = self.resolve_max_workers();
        let current = self.workers();

        match current.checked_add(delta) {
            Some(next) if next <= max_workers => {
                if self
                    .workers
                    .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    Admission::Admitted
                } else {
                    trace!("Worker count changed under admission of {}, retrying", delta);
                    Admission::Raced
                }
            }
            _ => Admission::Full,
        }
    }
}

impl Default for WorkerGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkerGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerGroup")
            .field("max_workers", &self.max_workers.load(Ordering::Relaxed))
            .field("workers", &self.workers.load(Ordering::Relaxed))
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// RAII guard that releases its workers on drop
///
/// Returned by [`WorkerGroup::guard`].
#[must_use = "dropping the guard releases the workers immediately"]
pub struct WorkerGuard<'a> {
    group: &'a WorkerGroup,
    count: u32,
}

impl WorkerGuard<'_> {
    /// Number of workers this guard holds
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        self.group.workers.fetch_sub(self.count, Ordering::AcqRel);
    }
}
