//! Terminal progress for pipeline runs

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::{DatasetReport, ObjectFailure, ProgressObserver, WrittenObject};

/// Spinner showing the dataset being processed and the objects done so far
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {prefix}: {pos} objects {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Remove the spinner from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ProgressReporter {
    fn dataset_started(&self, dataset: &str) {
        self.bar.reset();
        self.bar.set_prefix(dataset.to_string());
        self.bar.set_message("listing");
    }

    fn object_written(&self, _dataset: &str, written: &WrittenObject) {
        self.bar.inc(1);
        self.bar.set_message(written.destination_key.clone());
    }

    fn object_failed(&self, _dataset: &str, failure: &ObjectFailure) {
        self.bar.inc(1);
        self.bar.println(format!("  failed: {}", failure));
    }

    fn dataset_finished(&self, report: &DatasetReport) {
        self.bar.println(format!(
            "{}: {} ({} processed, {} skipped, {} failed)",
            report.dataset,
            report.outcome.label(),
            report.processed,
            report.skipped,
            report.failed
        ));
    }
}
