//! Page and chapter failure types

use crate::archive::ArchiveError;
use crate::postprocess::ProcessError;
use crate::source::SourceError;
use std::fmt;
use thiserror::Error;

/// Coarse classification of a failure, used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Every attempt timed out
    TransientNetwork,
    /// Refused connection, HTTP error status or broken body; never retried
    Transport,
    UnresolvableLocator,
    ContentSource,
    Processing,
    Archive,
    Cancelled,
    Io,
    /// The job task panicked or was aborted
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TransientNetwork => "network",
            FailureKind::Transport => "transport",
            FailureKind::UnresolvableLocator => "unresolvable",
            FailureKind::ContentSource => "source",
            FailureKind::Processing => "processing",
            FailureKind::Archive => "archive",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Io => "io",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Failure of a single page
#[derive(Debug, Error)]
pub enum PageError {
    #[error("page locator '{0}' cannot be resolved")]
    UnresolvableLocator(String),

    #[error("timed out after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("post-processing failed: {0}")]
    Processing(#[from] ProcessError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cancelled")]
    Cancelled,
}

impl PageError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PageError::UnresolvableLocator(_) => FailureKind::UnresolvableLocator,
            PageError::RetriesExhausted { .. } => FailureKind::TransientNetwork,
            PageError::Transport(_) => FailureKind::Transport,
            PageError::Processing(_) => FailureKind::Processing,
            PageError::Io(_) => FailureKind::Io,
            PageError::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Failure of a whole chapter job
#[derive(Debug, Error)]
pub enum ChapterError {
    #[error("chapter locator '{0}' cannot be resolved")]
    UnresolvableLocator(String),

    #[error("chapter has no pages")]
    NoPages,

    #[error("content source error: {0}")]
    Source(#[from] SourceError),

    #[error("page '{page}' failed: {source}")]
    Page {
        page: String,
        #[source]
        source: PageError,
    },

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("job stopped unexpectedly: {0}")]
    Aborted(String),

    #[error("cancelled")]
    Cancelled,
}

impl ChapterError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ChapterError::UnresolvableLocator(_) | ChapterError::NoPages => {
                FailureKind::UnresolvableLocator
            }
            ChapterError::Source(_) => FailureKind::ContentSource,
            ChapterError::Page { source, .. } => source.kind(),
            ChapterError::Archive(_) => FailureKind::Archive,
            ChapterError::Io(_) => FailureKind::Io,
            ChapterError::Aborted(_) => FailureKind::Internal,
            ChapterError::Cancelled => FailureKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == FailureKind::Cancelled
    }
}
