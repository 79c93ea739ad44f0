//! Progress tracking and reporting

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Job completion progress bar, shared by all jobs of a run
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: ProgressBar,
}

impl ProgressTracker {
    /// Create a tracker for `total_jobs`; a hidden tracker draws nothing
    ///
    /// # Errors
    ///
    /// Returns an error if the progress bar template is invalid
    pub fn new(total_jobs: u64, visible: bool) -> Result<Self> {
        if !visible {
            return Ok(Self {
                progress_bar: ProgressBar::hidden(),
            });
        }

        let pb = ProgressBar::new(total_jobs);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} jobs {msg}")?
                .progress_chars("#>-"),
        );

        Ok(Self { progress_bar: pb })
    }

    /// Show the current worker count next to the bar
    pub fn set_workers(&self, workers: u32, max_workers: u32) {
        self.progress_bar
            .set_message(format!("({workers}/{max_workers} workers)"));
    }

    pub fn job_done(&self) {
        self.progress_bar.inc(1);
    }

    pub fn finish(&self) {
        self.progress_bar.finish_with_message("all jobs drained");
    }
}
