//! Run statistics and the terminal summary
//!
//! This module turns a `RunSummary` into counts and prints the per-chapter
//! report shown at the end of an install.

use crate::download::FailureKind;
use crate::output::RunSummary;
use crate::state::JobStatus;
use std::collections::HashMap;

/// Aggregated counts of an install run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatistics {
    /// Number of selected chapters
    pub total_chapters: usize,

    /// Count of chapters by final status
    pub chapters_by_status: HashMap<JobStatus, usize>,

    /// Pages written across every chapter
    pub total_pages: usize,

    /// Failure kinds and their counts
    pub failures_by_kind: HashMap<FailureKind, usize>,
}

/// Computes statistics from a run summary
pub fn load_statistics(summary: &RunSummary) -> RunStatistics {
    let mut chapters_by_status = HashMap::new();
    let mut failures_by_kind = HashMap::new();
    let mut total_pages = 0;

    for outcome in &summary.outcomes {
        *chapters_by_status.entry(outcome.status).or_insert(0) += 1;
        total_pages += outcome.pages_written;

        if let Some(error) = &outcome.error {
            *failures_by_kind.entry(error.kind()).or_insert(0) += 1;
        }
    }

    RunStatistics {
        total_chapters: summary.outcomes.len(),
        chapters_by_status,
        total_pages,
        failures_by_kind,
    }
}

/// Prints the per-chapter report and the final status line to stdout
pub fn print_summary(summary: &RunSummary) {
    let stats = load_statistics(summary);

    println!("=== {} ===\n", summary.manga);

    for outcome in &summary.outcomes {
        match (&outcome.error, &outcome.archive) {
            (Some(error), _) => println!("  {:<12} {:<10} {}", outcome.label, outcome.status, error),
            (None, Some(path)) => println!(
                "  {:<12} {:<10} {}",
                outcome.label,
                outcome.status,
                path.display()
            ),
            (None, None) => println!("  {:<12} {}", outcome.label, outcome.status),
        }
    }
    println!();

    println!("Chapters by Status:");
    for status in [JobStatus::Archived, JobStatus::Skipped, JobStatus::Failed] {
        let count = stats.chapters_by_status.get(&status).copied().unwrap_or(0);
        if count > 0 {
            println!("  {}: {}", status, count);
        }
    }
    println!("  pages written: {}", stats.total_pages);
    println!();

    if !stats.failures_by_kind.is_empty() {
        println!("Failure Summary:");
        let mut kinds: Vec<_> = stats.failures_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

        for (kind, count) in kinds {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    println!("Final status: {}", summary.status);
}
