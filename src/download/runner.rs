//! Install run orchestration
//!
//! A `Runner` owns everything one invocation needs: the content source, the
//! run token, the progress spinner, the scheduler and the shutdown
//! coordinator. Callers must finish with [`Runner::close`] on every path,
//! successful or not.

use crate::archive::ArchiveWriter;
use crate::config::Config;
use crate::download::fetcher::ImageFetcher;
use crate::download::job::JobContext;
use crate::download::scheduler::ChapterJobScheduler;
use crate::download::selection::{select_chapters, ChapterSelection};
use crate::download::shutdown::{ShutdownCoordinator, ShutdownReport};
use crate::download::staging::RunStaging;
use crate::output::RunSummary;
use crate::postprocess::{ImageTransformConfig, PostProcessor};
use crate::progress::Progress;
use crate::source::{ContentSource, Listing, SourceError};
use crate::{Result, TankobonError};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Drives search, chapter listing and installs against one content source
pub struct Runner {
    config: Arc<Config>,
    source: Arc<dyn ContentSource>,
    run_token: CancellationToken,
    progress: Progress,
    staging: Arc<RunStaging>,
    scheduler: ChapterJobScheduler,
    shutdown: ShutdownCoordinator,
    initialized: bool,
}

impl Runner {
    /// Creates a runner
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded and validated configuration
    /// * `source` - The content source, not yet initialized
    /// * `run_token` - Cancelled on Ctrl-C; jobs get a child of it
    /// * `fetcher` - Page image fetcher and its retry policy
    /// * `progress` - Spinner shown while chapters download
    pub fn new(
        config: Config,
        source: Arc<dyn ContentSource>,
        run_token: CancellationToken,
        fetcher: ImageFetcher,
        progress: Progress,
    ) -> Self {
        let job_token = run_token.child_token();

        let ctx = Arc::new(JobContext {
            source: Arc::clone(&source),
            fetcher,
            processor: PostProcessor::new(),
            archiver: ArchiveWriter::new(),
        });

        let staging = Arc::new(RunStaging::new(config.staging_dir.clone()));

        let scheduler = ChapterJobScheduler::new(
            ctx,
            config.concurrency as usize,
            Arc::clone(&staging),
            config.output_dir.clone(),
            job_token.clone(),
        );

        let shutdown = ShutdownCoordinator::new(
            Arc::clone(&source),
            Arc::clone(&staging),
            run_token.clone(),
            job_token,
        );

        Self {
            config: Arc::new(config),
            source,
            run_token,
            progress,
            staging,
            scheduler,
            shutdown,
            initialized: false,
        }
    }

    pub fn scheduler(&self) -> &ChapterJobScheduler {
        &self.scheduler
    }

    /// This run's staging directory, once an install has created it
    pub fn staging_dir(&self) -> Option<PathBuf> {
        self.staging.path()
    }

    /// Opens the content source session; later calls do nothing
    pub async fn start(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        let source = Arc::clone(&self.source);
        self.cancellable(source.initialize()).await?;
        self.initialized = true;
        info!("Content source {} ready", self.source.name());
        Ok(())
    }

    /// Searches titles by name
    pub async fn search(&mut self, query: &str) -> Result<Listing> {
        self.start().await?;
        let source = Arc::clone(&self.source);
        match self.cancellable(source.find_titles(query)).await {
            Ok(titles) if titles.is_empty() => Err(TankobonError::NoTitles(query.to_string())),
            Ok(titles) => Ok(titles),
            Err(TankobonError::Source(SourceError::NotFound(_))) => {
                Err(TankobonError::NoTitles(query.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Lists the chapters of a title
    pub async fn chapters(&mut self, title_locator: &str) -> Result<Listing> {
        self.start().await?;
        let source = Arc::clone(&self.source);
        self.cancellable(source.list_chapters(title_locator)).await
    }

    /// Installs the selected chapters of a title
    ///
    /// The selection is validated before any job is created. Chapter
    /// failures end up in the summary; only cancellation and failures before
    /// the first job are returned as errors.
    pub async fn install(
        &mut self,
        manga: &str,
        chapters: &Listing,
        selection: ChapterSelection,
    ) -> Result<RunSummary> {
        let selected = select_chapters(chapters, &selection)?;
        self.start().await?;

        let transform = ImageTransformConfig::from(&self.config.image);
        info!(
            "Installing {} chapters of {} (selection {}, {} at a time)",
            selected.len(),
            manga,
            selection,
            self.scheduler.capacity()
        );

        self.progress
            .start(format!("Downloading {} ({} chapters)", manga, selected.len()));
        let result = self
            .scheduler
            .run(manga, selected, transform, &self.run_token)
            .await;
        self.progress.stop();

        let summary = RunSummary::new(manga, result?);
        for failed in summary.failures() {
            if let Some(error) = &failed.error {
                warn!("{} {} failed ({}): {}", manga, failed.label, error.kind(), error);
            }
        }
        info!("{}: {}", manga, summary.status);
        Ok(summary)
    }

    /// Tears the run down; must be called on every exit path
    ///
    /// Only the first call does any work. Returns
    /// `Err(TankobonError::Cancelled)` when the run token was cancelled.
    pub async fn close(&mut self) -> Result<ShutdownReport> {
        let report = self
            .shutdown
            .shutdown(self.scheduler.jobs_mut(), &self.progress)
            .await
            .clone();

        if report.cancelled {
            return Err(TankobonError::Cancelled);
        }
        Ok(report)
    }

    async fn cancellable<T>(
        &self,
        operation: impl Future<Output = std::result::Result<T, SourceError>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.run_token.cancelled() => Err(TankobonError::Cancelled),
            result = operation => Ok(result?),
        }
    }
}
