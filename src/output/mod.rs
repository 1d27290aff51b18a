//! Run outcomes and summaries
//!
//! This module handles:
//! - Per-chapter outcomes collected by the scheduler
//! - The run summary and its final status
//! - Printing statistics at the end of an install

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_summary, RunStatistics};
pub use summary::{ChapterOutcome, RunStatus, RunSummary};
