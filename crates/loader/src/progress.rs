//! Progress reporting for load runs.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

/// Progress tracker over the sequence of target tables.
pub struct LoadProgress {
    bar: ProgressBar,
    start_time: Instant,
}

impl LoadProgress {
    /// Create a tracker for `total_tables` table loads.
    pub fn new(total_tables: u64) -> Self {
        let bar = ProgressBar::new(total_tables);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} tables | {msg}")
                .expect("Invalid progress template")
                .progress_chars("#>-"),
        );
        bar.set_message("Loading...");

        LoadProgress {
            bar,
            start_time: Instant::now(),
        }
    }

    /// Mark one table as done.
    pub fn table_done(&self, table: &str) {
        self.bar.inc(1);
        self.bar.set_message(format!("Loaded {table}"));
    }

    /// Finish and return elapsed time.
    pub fn finish(self) -> std::time::Duration {
        self.bar.finish_with_message("Load complete");
        self.start_time.elapsed()
    }

    /// Elapsed time so far.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_tracks_elapsed_time() {
        let progress = LoadProgress::new(7);
        assert!(progress.elapsed().as_secs_f64() < 1.0);
    }
}
