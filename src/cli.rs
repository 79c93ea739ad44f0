//! Command-line interface definitions

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use worker_sync::WorkerGroupConfig;

/// Upper bound on simulated work per job
pub const MAX_WORK_MS: u64 = 60_000;

/// Run synthetic jobs through a bounded worker group
#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
pub struct Args {
    /// Number of jobs to run
    #[arg(short, long, default_value = "32")]
    pub jobs: u64,

    /// Maximum workers counted at once (0 = number of CPUs)
    #[arg(short, long, default_value = "0")]
    pub max_workers: u32,

    /// Workers admitted per job as one group
    ///
    /// Each job is admitted with a single `add(batch)` and releases `batch`
    /// workers when it finishes. Must not exceed --max-workers.
    #[arg(short, long, default_value = "1")]
    pub batch: u32,

    /// Simulated work per job, in milliseconds
    #[arg(long, default_value = "1")]
    pub work_ms: u64,

    /// Interval between re-checks while blocked, in nanoseconds
    #[arg(long, default_value = "10")]
    pub poll_interval_ns: u64,

    /// How jobs are executed
    #[arg(long, value_enum, default_value = "threads")]
    pub mode: Mode,

    /// Give up on an admission or the final drain after this many
    /// milliseconds (0 = wait forever)
    #[arg(long, default_value = "0")]
    pub timeout_ms: u64,

    /// Show progress information
    #[arg(long)]
    pub progress: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Job execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// One OS thread per job, blocking admission and drain
    Threads,
    /// One compio task per job, async admission and drain
    Async,
}

impl Args {
    /// Simulated work per job
    #[must_use]
    pub const fn work_duration(&self) -> Duration {
        Duration::from_millis(self.work_ms)
    }

    /// Admission/drain timeout, if one was requested
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    /// Worker group settings derived from the arguments
    #[must_use]
    pub const fn group_config(&self) -> WorkerGroupConfig {
        WorkerGroupConfig {
            max_workers: self.max_workers,
            poll_interval: Duration::from_nanos(self.poll_interval_ns),
        }
    }

    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - No jobs are requested
    /// - The batch size is 0 or exceeds an explicit max workers
    /// - The simulated work exceeds one minute
    /// - The poll interval is rejected by the worker group configuration
    /// - Both --quiet and --verbose options are used
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            anyhow::bail!("Number of jobs must be at least 1");
        }

        if self.batch == 0 {
            anyhow::bail!("Batch size must be at least 1");
        }

        if self.max_workers != 0 && self.batch > self.max_workers {
            anyhow::bail!(
                "Batch size {} exceeds max workers {}",
                self.batch,
                self.max_workers
            );
        }

        if self.work_ms > MAX_WORK_MS {
            anyhow::bail!("Work per job must be at most {MAX_WORK_MS} ms");
        }

        self.group_config().validate()?;

        if self.quiet && self.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        Ok(())
    }
}
