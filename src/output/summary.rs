//! Per-chapter outcomes and the run summary

use crate::download::ChapterError;
use crate::state::JobStatus;
use std::fmt;
use std::path::PathBuf;

/// Final result of one selected chapter
#[derive(Debug)]
pub struct ChapterOutcome {
    /// Chapter label as listed by the source
    pub label: String,

    /// Terminal status of the job
    pub status: JobStatus,

    /// Pages fetched and processed before the job ended
    pub pages_written: usize,

    /// Archive path, for archived and skipped chapters
    pub archive: Option<PathBuf>,

    pub error: Option<ChapterError>,
}

impl ChapterOutcome {
    pub fn archived(label: impl Into<String>, pages_written: usize, archive: PathBuf) -> Self {
        Self {
            label: label.into(),
            status: JobStatus::Archived,
            pages_written,
            archive: Some(archive),
            error: None,
        }
    }

    pub fn skipped(label: impl Into<String>, archive: PathBuf) -> Self {
        Self {
            label: label.into(),
            status: JobStatus::Skipped,
            pages_written: 0,
            archive: Some(archive),
            error: None,
        }
    }

    pub fn failed(label: impl Into<String>, pages_written: usize, error: ChapterError) -> Self {
        Self {
            label: label.into(),
            status: JobStatus::Failed,
            pages_written,
            archive: None,
            error: Some(error),
        }
    }
}

/// Overall status of an install run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Number of failed chapters
    CompletedWithFailures(usize),
    Aborted,
}

impl RunStatus {
    pub fn from_outcomes(outcomes: &[ChapterOutcome]) -> Self {
        let failed = outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Failed)
            .count();
        if failed == 0 {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithFailures(failed)
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::CompletedWithFailures(1) => write!(f, "completed with 1 chapter failure"),
            RunStatus::CompletedWithFailures(n) => {
                write!(f, "completed with {} chapter failures", n)
            }
            RunStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// Everything an install run produced, in selection order
#[derive(Debug)]
pub struct RunSummary {
    pub manga: String,
    pub outcomes: Vec<ChapterOutcome>,
    pub status: RunStatus,
}

impl RunSummary {
    pub fn new(manga: impl Into<String>, outcomes: Vec<ChapterOutcome>) -> Self {
        debug_assert!(outcomes.iter().all(|o| o.status.is_terminal()));
        let status = RunStatus::from_outcomes(&outcomes);
        Self {
            manga: manga.into(),
            outcomes,
            status,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChapterOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Failed)
    }
}
