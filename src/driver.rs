//! Job driver
//!
//! Runs the synthetic jobs described by [`Args`] through one [`WorkerGroup`].
//! The driver itself is the admitter: for every job it counts `batch` workers
//! in (blocking while the group is full), hands the job to a thread or compio
//! task, and the job counts its workers out when it finishes. Once every job
//! has been admitted the driver drains the group.
//!
//! # Phases
//!
//! 1. **Setup**: build the group from the arguments and resolve its max
//! 2. **Admission**: `add`/`add_async` per job, recording peak occupancy
//! 3. **Drain**: `wait`/`wait_async`, then join the jobs
//!
//! With `--timeout-ms` the admission and drain use the timed variants and a
//! timeout aborts the run.

use crate::cli::{Args, Mode};
use crate::progress::ProgressTracker;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use worker_sync::{WorkerGroup, WorkerGroupError};

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Jobs that ran to completion
    pub jobs_completed: u64,
    /// Max workers in effect for the run
    pub max_workers: u32,
    /// Highest worker count observed right after an admission
    pub peak_workers: u32,
    /// Wall time from first admission to drained
    pub duration: Duration,
}

/// Per-run job parameters shared by both modes
#[derive(Debug, Clone, Copy)]
struct JobSpec {
    jobs: u64,
    batch: u32,
    work: Duration,
    timeout: Option<Duration>,
}

/// Run all jobs and drain the group
///
/// # Errors
///
/// This function will return an error if:
/// - The worker group configuration is invalid
/// - The batch size exceeds the resolved max workers
/// - An admission or the drain times out (`--timeout-ms`)
/// - The compio runtime cannot be started (async mode)
/// - A job panics
pub fn run(args: &Args) -> Result<RunStats> {
    let group = Arc::new(
        WorkerGroup::from_config(&args.group_config())
            .context("Invalid worker group configuration")?,
    );
    let max_workers = group.max_workers(0);

    if args.batch > max_workers {
        anyhow::bail!(
            "Batch size {} exceeds max workers {}",
            args.batch,
            max_workers
        );
    }

    let spec = JobSpec {
        jobs: args.jobs,
        batch: args.batch,
        work: args.work_duration(),
        timeout: args.timeout(),
    };
    info!(
        "Running {} jobs ({:?} mode), max workers {}, batch {}",
        spec.jobs, args.mode, max_workers, spec.batch
    );

    let progress = ProgressTracker::new(spec.jobs, args.progress)?;
    let completed = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    let peak_workers = match args.mode {
        Mode::Threads => run_threads(&group, spec, &progress, &completed)?,
        Mode::Async => run_async(&group, spec, &progress, &completed)?,
    };

    progress.finish();
    let stats = RunStats {
        jobs_completed: completed.load(Ordering::Acquire),
        max_workers,
        peak_workers,
        duration: start.elapsed(),
    };
    debug!("Run finished: {:?}", stats);
    Ok(stats)
}

fn run_threads(
    group: &WorkerGroup,
    spec: JobSpec,
    progress: &ProgressTracker,
    completed: &AtomicU64,
) -> Result<u32> {
    thread::scope(|scope| -> Result<u32> {
        let mut peak = 0;

        for id in 0..spec.jobs {
            admit(group, spec)?;
            peak = peak.max(record_admission(group, progress, id));

            scope.spawn(move || {
                thread::sleep(spec.work);
                finish_job(group, spec.batch, progress, completed);
            });
        }

        drain(group, spec)?;
        Ok(peak)
    })
}

fn run_async(
    group: &Arc<WorkerGroup>,
    spec: JobSpec,
    progress: &ProgressTracker,
    completed: &Arc<AtomicU64>,
) -> Result<u32> {
    let runtime = compio::runtime::Runtime::new().context("Failed to start compio runtime")?;

    runtime.block_on(async {
        let mut peak = 0;
        let mut handles = Vec::new();

        for id in 0..spec.jobs {
            admit_async(group, spec).await?;
            peak = peak.max(record_admission(group, progress, id));

            let group = Arc::clone(group);
            let progress = progress.clone();
            let completed = Arc::clone(completed);
            handles.push(compio::runtime::spawn(async move {
                compio::time::sleep(spec.work).await;
                finish_job(&group, spec.batch, &progress, &completed);
            }));
        }

        drain_async(group, spec).await?;

        for result in futures::future::join_all(handles).await {
            result.map_err(|_| anyhow::anyhow!("Job task panicked"))?;
        }
        Ok::<_, anyhow::Error>(peak)
    })
}

fn admit(group: &WorkerGroup, spec: JobSpec) -> Result<()> {
    match spec.timeout {
        Some(timeout) => group
            .add_timeout(spec.batch, timeout)
            .map_err(timed_out("admission")),
        None => {
            group.add(spec.batch);
            Ok(())
        }
    }
}

async fn admit_async(group: &WorkerGroup, spec: JobSpec) -> Result<()> {
    match spec.timeout {
        // Dropping `add_async` before it commits leaves the count untouched
        Some(timeout) => compio::time::timeout(timeout, group.add_async(spec.batch))
            .await
            .map_err(|_| WorkerGroupError::Timeout(timeout))
            .map_err(timed_out("admission")),
        None => {
            group.add_async(spec.batch).await;
            Ok(())
        }
    }
}

fn drain(group: &WorkerGroup, spec: JobSpec) -> Result<()> {
    match spec.timeout {
        Some(timeout) => group.wait_timeout(timeout).map_err(timed_out("drain")),
        None => {
            group.wait();
            Ok(())
        }
    }
}

async fn drain_async(group: &WorkerGroup, spec: JobSpec) -> Result<()> {
    match spec.timeout {
        Some(timeout) => compio::time::timeout(timeout, group.wait_async())
            .await
            .map_err(|_| WorkerGroupError::Timeout(timeout))
            .map_err(timed_out("drain")),
        None => {
            group.wait_async().await;
            Ok(())
        }
    }
}

fn record_admission(group: &WorkerGroup, progress: &ProgressTracker, id: u64) -> u32 {
    let workers = group.workers();
    debug!("Admitted job {} ({} workers)", id, workers);
    progress.set_workers(workers, group.max_workers(0));
    workers
}

fn finish_job(group: &WorkerGroup, batch: u32, progress: &ProgressTracker, completed: &AtomicU64) {
    completed.fetch_add(1, Ordering::AcqRel);
    progress.job_done();
    for _ in 0..batch {
        group.done();
    }
}

fn timed_out(phase: &'static str) -> impl Fn(WorkerGroupError) -> anyhow::Error {
    move |err| {
        warn!("Worker group {} gave up: {}", phase, err);
        anyhow::Error::new(err).context(format!("Worker group {phase} timed out"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["workergroup"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_run_threads() {
        let stats = run(&args(&["--jobs", "32", "--max-workers", "3"])).unwrap();
        assert_eq!(stats.jobs_completed, 32);
        assert_eq!(stats.max_workers, 3);
        assert!(stats.peak_workers >= 1 && stats.peak_workers <= 3);
    }

    #[test]
    fn test_run_threads_batched() {
        let stats = run(&args(&["--jobs", "10", "--max-workers", "4", "--batch", "2"])).unwrap();
        assert_eq!(stats.jobs_completed, 10);
        assert!(stats.peak_workers >= 2 && stats.peak_workers <= 4);
    }

    // Async runs carry a timeout so a stalled admission fails instead of hanging

    #[test]
    fn test_run_async() {
        let stats = run(&args(&[
            "--jobs",
            "16",
            "--max-workers",
            "2",
            "--mode",
            "async",
            "--timeout-ms",
            "10000",
        ]))
        .unwrap();
        assert_eq!(stats.jobs_completed, 16);
        assert!(stats.peak_workers <= 2);
    }

    #[test]
    fn test_run_async_single_worker() {
        // Every admission after the first blocks until a job task on the same
        // runtime releases
        let stats = run(&args(&[
            "--jobs",
            "4",
            "--max-workers",
            "1",
            "--mode",
            "async",
            "--timeout-ms",
            "10000",
        ]))
        .unwrap();
        assert_eq!(stats.jobs_completed, 4);
        assert_eq!(stats.peak_workers, 1);
    }

    #[test]
    fn test_run_async_admission_timeout() {
        let err = run(&args(&[
            "--jobs",
            "3",
            "--max-workers",
            "1",
            "--work-ms",
            "500",
            "--mode",
            "async",
            "--timeout-ms",
            "20",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_run_with_generous_timeout() {
        let stats = run(&args(&["--jobs", "8", "--max-workers", "2", "--timeout-ms", "10000"])).unwrap();
        assert_eq!(stats.jobs_completed, 8);
    }

    #[test]
    fn test_run_admission_timeout() {
        let err = run(&args(&[
            "--jobs",
            "4",
            "--max-workers",
            "1",
            "--work-ms",
            "500",
            "--timeout-ms",
            "20",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_run_default_max_workers() {
        let stats = run(&args(&["--jobs", "4"])).unwrap();
        assert_eq!(stats.max_workers, worker_sync::default_parallelism());
    }

    #[test]
    fn test_batch_exceeds_resolved_max() {
        let batch = (worker_sync::default_parallelism() + 1).to_string();
        let err = run(&args(&["--jobs", "1", "--batch", batch.as_str()])).unwrap_err();
        assert!(err.to_string().contains("exceeds max workers"));
    }
}
