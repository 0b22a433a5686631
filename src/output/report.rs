//! Crawl report accumulated from the outcome stream
//!
//! The report keeps counts for every outcome but only the first
//! [`MAX_REPORTED_ERRORS`] error messages, so a crawl of thousands of broken
//! pages stays readable.

use crate::crawler::{FailureKind, FetchOutcome};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Number of failure messages kept verbatim
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// When the crawl started
    pub started_at: DateTime<Utc>,

    /// When the outcome stream ended
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of targets handed to the coordinator
    pub targets: usize,

    /// Targets that produced an article
    pub succeeded: usize,

    /// Targets that failed on their last attempt
    pub failed: usize,

    /// Failure counts per classification
    pub failures_by_kind: HashMap<FailureKind, usize>,

    /// Fetch attempts across all reported targets
    pub total_attempts: u64,

    /// Articles a sink failed to store
    pub sink_errors: usize,

    /// The first failure messages, in arrival order
    pub errors: Vec<String>,
}

impl CrawlReport {
    /// Starts an empty report for `targets` targets
    pub fn new(targets: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            targets,
            succeeded: 0,
            failed: 0,
            failures_by_kind: HashMap::new(),
            total_attempts: 0,
            sink_errors: 0,
            errors: Vec::new(),
        }
    }

    /// Records a single outcome
    pub fn record(&mut self, outcome: &FetchOutcome) {
        self.total_attempts += u64::from(outcome.attempts());

        match outcome {
            FetchOutcome::Success { .. } => self.succeeded += 1,
            FetchOutcome::Failure {
                target,
                kind,
                attempts,
                error,
            } => {
                self.failed += 1;
                *self.failures_by_kind.entry(*kind).or_insert(0) += 1;

                if self.errors.len() < MAX_REPORTED_ERRORS {
                    self.errors.push(format!(
                        "failed to fetch {} after {} attempt(s): {}: {}",
                        target, attempts, kind, error
                    ));
                }
            }
        }
    }

    pub fn record_sink_error(&mut self) {
        self.sink_errors += 1;
    }

    /// Marks the end of the crawl
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Targets that reported an outcome
    pub fn reported(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Targets that never reported (crawl stopped before they started)
    pub fn skipped(&self) -> usize {
        self.targets.saturating_sub(self.reported())
    }

    /// Whether more failures happened than are listed in [`CrawlReport::errors`]
    pub fn errors_truncated(&self) -> bool {
        self.failed > self.errors.len()
    }

    /// Duration in seconds, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Percentage of reported targets that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.reported() == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.reported() as f64) * 100.0
    }
}

/// Prints a crawl report to stdout
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &CrawlReport) {
    println!("\n=== Summary ===");
    println!("Successfully fetched: {} articles", report.succeeded);
    println!("Failed: {} articles", report.failed);
    if report.skipped() > 0 {
        println!("Not attempted: {} articles", report.skipped());
    }
    if report.sink_errors > 0 {
        println!("Storage errors: {}", report.sink_errors);
    }
    println!(
        "Success rate: {:.1}% ({} attempts in total)",
        report.success_rate(),
        report.total_attempts
    );

    if !report.failures_by_kind.is_empty() {
        println!("\nFailures by kind:");
        let mut kinds: Vec<_> = report.failures_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in kinds {
            println!("  {}: {}", kind, count);
        }
    }

    if report.errors.is_empty() {
        return;
    }

    if report.errors_truncated() {
        println!(
            "\nShowing first {} errors of {} total:",
            report.errors.len(),
            report.failed
        );
    } else {
        println!("\nErrors:");
    }
    for error in &report.errors {
        println!("- {}", error);
    }
}
