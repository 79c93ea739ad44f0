//! workergroup: run synthetic jobs through a bounded worker group
//!
//! Admits each job into a shared worker group, blocking while the group is
//! full, then drains the group and reports what was observed.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use workergroup::cli::Args;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging based on verbosity and quiet mode
    if args.quiet {
        // In quiet mode, only log errors
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::ERROR)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(match args.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            })
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;
    }

    // Validate arguments
    args.validate().context("Invalid arguments")?;

    info!("Starting workergroup v{}", env!("CARGO_PKG_VERSION"));
    info!("Jobs: {}", args.jobs);
    info!("Mode: {:?}", args.mode);
    info!("Batch: {}", args.batch);
    info!("Work per job: {:?}", args.work_duration());
    info!("Poll interval: {:?}", args.group_config().poll_interval);

    let stats = workergroup::run(&args).context("Run failed")?;

    if !args.quiet {
        println!("Jobs completed: {}", stats.jobs_completed);
        println!("Max workers: {}", stats.max_workers);
        println!("Peak workers: {}", stats.peak_workers);
        println!("Duration: {:?}", stats.duration);
    }

    Ok(())
}
