/// Job status definitions for tracking chapter downloads
///
/// This module defines every state a chapter job can be in between selection and teardown.
use std::fmt;

/// Represents the current state of a chapter job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    // ===== Active States =====
    /// Job was created but has not been admitted by the concurrency limiter yet
    Pending,

    /// Pages are being resolved and downloaded
    Fetching,

    /// A downloaded page is being post-processed
    Processing,

    // ===== Terminal States =====
    /// Every page was processed and the chapter archive is in place
    Archived,

    /// A page, the content source or the archive writer failed
    Failed,

    /// The archive already existed, so no job was started
    Skipped,
}

impl JobStatus {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archived | Self::Failed | Self::Skipped)
    }

    /// Short lowercase label used in logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Processing => "processing",
            Self::Archived => "archived",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Checks whether a job may move from this state to `next`
    ///
    /// Jobs only move forward: `Pending -> Fetching <-> Processing -> Archived`,
    /// and any active state may fail. `Skipped` is only reachable from `Pending`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Fetching | Self::Skipped | Self::Failed) => true,
            (Self::Fetching, Self::Processing | Self::Archived | Self::Failed) => true,
            (Self::Processing, Self::Fetching | Self::Archived | Self::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
