//! Shutdown coordinator
//!
//! Runs once per invocation, on every exit path. Steps, in order:
//!
//! 1. Stop the progress spinner
//! 2. Cancel outstanding jobs and wait for each of them
//! 3. Remove this run's staging directory
//! 4. Release the content source in a spawned task
//! 5. Report whether the run was cancelled
//!
//! Every step is best-effort: failures are logged and recorded, and later
//! steps still run. Jobs are drained and staging is removed before the
//! release, so no job writes into a removed directory or talks to a released
//! source. The release runs in its own task, so dropping the caller cannot
//! interrupt it, and it runs at most once even if the sequence is restarted.

use crate::download::scheduler::IndexedOutcome;
use crate::download::staging::RunStaging;
use crate::progress::Progress;
use crate::source::ContentSource;
use crate::state::JobStatus;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the shutdown sequence did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Jobs that were still running when shutdown began
    pub jobs_drained: usize,

    /// Drained jobs that panicked or were aborted
    pub jobs_panicked: usize,

    pub staging_removed: bool,

    pub source_released: bool,

    /// The run token was cancelled at some point
    pub cancelled: bool,

    /// Step failures, in the order they happened
    pub errors: Vec<String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.jobs_panicked == 0
    }
}

type ReleaseOutcome = Option<Result<(), String>>;

/// Tears down a run exactly once
pub struct ShutdownCoordinator {
    source: Arc<dyn ContentSource>,
    staging: Arc<RunStaging>,
    run_token: CancellationToken,
    job_token: CancellationToken,
    report: OnceCell<ShutdownReport>,
    /// Result of the spawned release task, shared by every caller
    release: Mutex<Option<watch::Receiver<ReleaseOutcome>>>,
}

impl ShutdownCoordinator {
    pub fn new(
        source: Arc<dyn ContentSource>,
        staging: Arc<RunStaging>,
        run_token: CancellationToken,
        job_token: CancellationToken,
    ) -> Self {
        Self {
            source,
            staging,
            run_token,
            job_token,
            report: OnceCell::new(),
            release: Mutex::new(None),
        }
    }

    /// Returns true once the sequence has completed
    pub fn is_done(&self) -> bool {
        self.report.initialized()
    }

    /// Runs the shutdown sequence; later calls return the first report
    pub async fn shutdown(
        &self,
        jobs: &mut JoinSet<IndexedOutcome>,
        progress: &Progress,
    ) -> &ShutdownReport {
        self.report
            .get_or_init(move || self.run_steps(jobs, progress))
            .await
    }

    async fn run_steps(
        &self,
        jobs: &mut JoinSet<IndexedOutcome>,
        progress: &Progress,
    ) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        info!("Shutting down");

        progress.stop();

        self.drain_jobs(jobs, &mut report).await;

        self.remove_staging(&mut report).await;

        self.release_source(&mut report).await;

        report.cancelled = self.run_token.is_cancelled();
        if report.cancelled {
            info!("Run was cancelled");
        }

        debug!("Shutdown report: {:?}", report);
        report
    }

    async fn drain_jobs(&self, jobs: &mut JoinSet<IndexedOutcome>, report: &mut ShutdownReport) {
        self.job_token.cancel();
        if jobs.is_empty() {
            return;
        }

        info!("Cancelling {} outstanding chapter jobs", jobs.len());

        while let Some(joined) = jobs.join_next().await {
            report.jobs_drained += 1;
            match joined {
                Ok((_, outcome)) if outcome.status == JobStatus::Archived => {
                    debug!("{} finished before cancellation took effect", outcome.label);
                }
                Ok((_, outcome)) => {
                    debug!("{} stopped: {}", outcome.label, outcome.status);
                }
                Err(e) => {
                    error!("Chapter job did not finish cleanly: {}", e);
                    report.jobs_panicked += 1;
                    report.errors.push(format!("job: {}", e));
                }
            }
        }
    }

    async fn remove_staging(&self, report: &mut ShutdownReport) {
        match self.staging.remove().await {
            Ok(Some(path)) => {
                debug!("Removed staging dir {}", path.display());
                report.staging_removed = true;
            }
            Ok(None) => report.staging_removed = true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                report.staging_removed = true;
            }
            Err(e) => {
                let root = self.staging.root().display();
                warn!("Failed to remove staging dir in {}: {}", root, e);
                report.errors.push(format!("staging {}: {}", root, e));
            }
        }
    }

    /// Spawns the release on first use; later callers wait on the same task
    fn release_task(&self) -> watch::Receiver<ReleaseOutcome> {
        let mut release = self.release.lock().unwrap_or_else(|e| e.into_inner());
        release
            .get_or_insert_with(|| {
                let (tx, rx) = watch::channel(None);
                let source = Arc::clone(&self.source);
                tokio::spawn(async move {
                    let result = source.release().await.map_err(|e| e.to_string());
                    let _ = tx.send(Some(result));
                });
                rx
            })
            .clone()
    }

    async fn release_source(&self, report: &mut ShutdownReport) {
        let mut release = self.release_task();
        let outcome = release
            .wait_for(Option::is_some)
            .await
            .map(|outcome| outcome.clone());

        match outcome {
            Ok(Some(Ok(()))) => {
                info!("Released content source {}", self.source.name());
                report.source_released = true;
            }
            Ok(Some(Err(e))) => {
                warn!("Failed to release content source: {}", e);
                report.errors.push(format!("release: {}", e));
            }
            Ok(None) | Err(_) => {
                error!("Content source release task did not finish");
                report
                    .errors
                    .push("release: task ended without a result".to_string());
            }
        }
    }
}
