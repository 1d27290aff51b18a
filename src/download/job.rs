//! A single chapter job
//!
//! A job resolves the pages of one chapter, fetches and post-processes them
//! in page order inside its own staging directory, then archives the
//! directory. Any page failure fails the whole chapter; siblings are not
//! affected.

use crate::archive::{archive_path, ArchiveWriter};
use crate::download::errors::{ChapterError, PageError};
use crate::download::fetcher::{ImageFetcher, PageFetchTask};
use crate::output::ChapterOutcome;
use crate::postprocess::{ImageTransformConfig, PostProcessor};
use crate::source::{is_unresolvable, ContentSource};
use crate::state::JobStatus;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Extension under which every page is staged and archived
pub const PAGE_EXTENSION: &str = "png";

/// Collaborators shared by every job of a run
pub struct JobContext {
    pub source: Arc<dyn ContentSource>,
    pub fetcher: ImageFetcher,
    pub processor: PostProcessor,
    pub archiver: ArchiveWriter,
}

/// Replaces characters that are unsafe in a path component
///
/// Path separators, characters rejected by common filesystems and control
/// characters become `_`. Leading and trailing dots and spaces are dropped
/// so names like `..` can never escape their parent directory.
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// One selected chapter, from creation to a terminal status
#[derive(Debug)]
pub struct ChapterJob {
    pub manga: String,
    pub label: String,
    pub locator: String,
    /// Exclusive to this job
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
    pub archive_name: String,
    pub transform: ImageTransformConfig,
    pub status: JobStatus,
    pub pages: Vec<PageFetchTask>,
}

impl ChapterJob {
    pub fn new(
        manga: &str,
        label: &str,
        locator: &str,
        staging_root: &Path,
        output_root: &Path,
        transform: ImageTransformConfig,
    ) -> Self {
        let manga_dir = sanitize_component(manga);
        let chapter_dir = sanitize_component(label);

        Self {
            manga: manga.to_string(),
            label: label.to_string(),
            locator: locator.to_string(),
            staging_dir: staging_root.join(&manga_dir).join(&chapter_dir),
            output_dir: output_root.join(&manga_dir),
            archive_name: format!("{}-{}", manga_dir, chapter_dir),
            transform,
            status: JobStatus::Pending,
            pages: Vec::new(),
        }
    }

    /// Appends ` (n)` to the chapter's staging directory and archive name
    ///
    /// Used when another chapter of the same run already maps to the same
    /// file name, e.g. `Ch. 1/2` and `Ch. 1_2`.
    pub fn disambiguate(&mut self, n: usize) {
        let chapter_dir = format!("{} ({})", sanitize_component(&self.label), n);
        self.staging_dir.set_file_name(&chapter_dir);
        self.archive_name = format!("{}-{}", sanitize_component(&self.manga), chapter_dir);
    }

    /// Final location of this chapter's archive
    pub fn archive_path(&self) -> PathBuf {
        archive_path(&self.output_dir, &self.archive_name)
    }

    fn transition(&mut self, next: JobStatus) {
        if self.status == next {
            return;
        }
        debug_assert!(
            self.status.can_transition_to(next),
            "invalid job transition {} -> {}",
            self.status,
            next
        );
        debug!("{} {}: {} -> {}", self.manga, self.label, self.status, next);
        self.status = next;
    }

    fn pages_written(&self) -> usize {
        self.pages.iter().filter(|p| p.dest.exists()).count()
    }

    /// Runs the job to a terminal status
    ///
    /// Never returns an error: failures are carried in the outcome. On
    /// success the staging directory is removed; on failure it is left in
    /// place until the staging root is cleaned up.
    pub async fn run(mut self, ctx: Arc<JobContext>, cancel: CancellationToken) -> ChapterOutcome {
        self.transition(JobStatus::Fetching);

        match self.execute(&ctx, &cancel).await {
            Ok(archive) => {
                self.transition(JobStatus::Archived);
                let pages_written = self.pages.len();
                if let Err(e) = tokio::fs::remove_dir_all(&self.staging_dir).await {
                    warn!(
                        "Failed to remove staging dir {}: {}",
                        self.staging_dir.display(),
                        e
                    );
                }
                ChapterOutcome::archived(self.label, pages_written, archive)
            }
            Err(error) => {
                self.transition(JobStatus::Failed);
                if error.is_cancelled() {
                    info!("{} {} cancelled", self.manga, self.label);
                } else {
                    warn!("{} {} failed: {}", self.manga, self.label, error);
                }
                let pages_written = self.pages_written();
                ChapterOutcome::failed(self.label, pages_written, error)
            }
        }
    }

    async fn execute(
        &mut self,
        ctx: &JobContext,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, ChapterError> {
        if is_unresolvable(&self.locator) {
            return Err(ChapterError::UnresolvableLocator(self.locator.clone()));
        }

        let listing = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChapterError::Cancelled),
            listing = ctx.source.resolve_chapter_pages(&self.locator) => listing?,
        };
        if listing.is_empty() {
            return Err(ChapterError::NoPages);
        }

        tokio::fs::create_dir_all(&self.staging_dir).await?;

        self.pages = listing
            .iter()
            .map(|(name, locator)| {
                let file = format!("{}.{}", sanitize_component(name), PAGE_EXTENSION);
                PageFetchTask::new(name, locator, self.staging_dir.join(file))
            })
            .collect();

        info!(
            "{} {}: {} pages",
            self.manga,
            self.label,
            self.pages.len()
        );

        for index in 0..self.pages.len() {
            self.transition(JobStatus::Fetching);
            let task = &mut self.pages[index];
            ctx.fetcher
                .fetch(task, cancel)
                .await
                .map_err(|source| page_error(task, source))?;

            if cancel.is_cancelled() {
                return Err(ChapterError::Cancelled);
            }

            self.transition(JobStatus::Processing);
            let task = &self.pages[index];
            let processor = ctx.processor;
            let transform = self.transform;
            let path = task.dest.clone();
            tokio::task::spawn_blocking(move || processor.process(&path, &transform))
                .await
                .map_err(|e| page_error(task, PageError::Io(join_error(e))))?
                .map_err(|e| page_error(task, e.into()))?;
        }

        if cancel.is_cancelled() {
            return Err(ChapterError::Cancelled);
        }

        let archiver = ctx.archiver;
        let staging_dir = self.staging_dir.clone();
        let output_dir = self.output_dir.clone();
        let archive_name = self.archive_name.clone();
        let archive = tokio::task::spawn_blocking(move || {
            archiver.write(&staging_dir, &output_dir, &archive_name)
        })
        .await
        .map_err(join_error)??;

        Ok(archive)
    }
}

fn page_error(task: &PageFetchTask, source: PageError) -> ChapterError {
    ChapterError::Page {
        page: task.name.clone(),
        source,
    }
}

fn join_error(e: tokio::task::JoinError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}
