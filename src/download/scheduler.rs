//! Chapter job scheduler
//!
//! This module handles:
//! - Giving chapters whose names collide on disk distinct file names
//! - Skipping chapters whose archive already exists
//! - Admitting one job per remaining chapter under a fixed-capacity semaphore
//! - Collecting job outcomes in selection order, including jobs that panicked
//!
//! Permits are acquired before a job is spawned, so jobs are admitted in the
//! order they were created. Completion order is unconstrained.

use crate::download::errors::ChapterError;
use crate::download::job::{ChapterJob, JobContext};
use crate::download::staging::RunStaging;
use crate::output::ChapterOutcome;
use crate::postprocess::ImageTransformConfig;
use crate::TankobonError;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Position of a chapter in the selection, paired with its outcome
pub type IndexedOutcome = (usize, ChapterOutcome);

/// Live and peak in-flight job counters
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

/// Tracks one admitted job until it finishes or is aborted
struct InFlightGuard {
    counters: Arc<InFlight>,
}

impl InFlightGuard {
    fn enter(counters: Arc<InFlight>) -> Self {
        let now = counters.current.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak.fetch_max(now, Ordering::SeqCst);
        Self { counters }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counters.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Turns selected chapters into concurrently running jobs
pub struct ChapterJobScheduler {
    /// Bounds the number of jobs in flight
    semaphore: Arc<Semaphore>,

    capacity: usize,

    ctx: Arc<JobContext>,

    staging: Arc<RunStaging>,

    output_root: PathBuf,

    /// Jobs spawned and not yet joined
    jobs: JoinSet<IndexedOutcome>,

    /// Selection position and label of every job in `jobs`
    running: HashMap<Id, (usize, String)>,

    /// Cancelled by shutdown; a child of the run token
    job_token: CancellationToken,

    in_flight: Arc<InFlight>,
}

impl ChapterJobScheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `ctx` - Source, fetcher, processor and archiver shared by every job
    /// * `capacity` - Maximum number of jobs in flight (at least 1)
    /// * `staging` - This run's staging directory, parent of every job's
    /// * `output_root` - Parent of every title's archive directory
    /// * `job_token` - Token handed to every job
    pub fn new(
        ctx: Arc<JobContext>,
        capacity: usize,
        staging: Arc<RunStaging>,
        output_root: PathBuf,
        job_token: CancellationToken,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            ctx,
            staging,
            output_root,
            jobs: JoinSet::new(),
            running: HashMap::new(),
            job_token,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of jobs currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.in_flight.current.load(Ordering::SeqCst)
    }

    /// Highest number of jobs that were in flight at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }

    /// Jobs that are still running, for the shutdown coordinator to drain
    pub fn jobs_mut(&mut self) -> &mut JoinSet<IndexedOutcome> {
        &mut self.jobs
    }

    /// Runs every selected chapter and returns outcomes in selection order
    ///
    /// Chapters whose archive already exists are reported as skipped and
    /// start no job. Job failures are recorded, never raised; a job that
    /// panics is recorded as failed.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ChapterOutcome>)` - Every selected chapter reached a terminal status
    /// * `Err(TankobonError::Cancelled)` - `run_token` fired; admitted jobs are
    ///   left in the job set for the shutdown coordinator
    pub async fn run(
        &mut self,
        manga: &str,
        selected: Vec<(String, String)>,
        transform: ImageTransformConfig,
        run_token: &CancellationToken,
    ) -> Result<Vec<ChapterOutcome>, TankobonError> {
        let staging_dir = self.staging.ensure()?;
        let mut outcomes: Vec<IndexedOutcome> = Vec::with_capacity(selected.len());
        let mut claimed = HashSet::new();

        for (index, (label, locator)) in selected.into_iter().enumerate() {
            if run_token.is_cancelled() {
                return Err(TankobonError::Cancelled);
            }

            let mut job = ChapterJob::new(
                manga,
                &label,
                &locator,
                &staging_dir,
                &self.output_root,
                transform,
            );

            // compared case-insensitively for case-folding filesystems
            let mut suffix = index + 1;
            while !claimed.insert(job.archive_name.to_lowercase()) {
                job.disambiguate(suffix);
                suffix += 1;
            }
            if suffix > index + 1 {
                warn!(
                    "{} {} collides with an earlier chapter on disk, stored as {}",
                    manga, label, job.archive_name
                );
            }

            let archive = job.archive_path();
            if archive.exists() {
                info!("Skipping {} {}: {} exists", manga, label, archive.display());
                outcomes.push((index, ChapterOutcome::skipped(label, archive)));
                continue;
            }

            let permit = self.admit(run_token).await?;
            debug!("Admitted {} {} ({} in flight)", manga, label, self.in_flight());
            self.spawn(index, job, permit);
        }

        loop {
            let joined = tokio::select! {
                biased;
                _ = run_token.cancelled() => return Err(TankobonError::Cancelled),
                joined = self.jobs.join_next_with_id() => joined,
            };

            match joined {
                Some(Ok((id, outcome))) => {
                    self.running.remove(&id);
                    outcomes.push(outcome);
                }
                Some(Err(e)) => {
                    let Some((index, label)) = self.running.remove(&e.id()) else {
                        error!("Untracked chapter job of {} did not finish: {}", manga, e);
                        continue;
                    };
                    error!("Chapter job {} {} did not finish: {}", manga, label, e);
                    let error = ChapterError::Aborted(e.to_string());
                    outcomes.push((index, ChapterOutcome::failed(label, 0, error)));
                }
                None => break,
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }

    async fn admit(&self, run_token: &CancellationToken) -> Result<OwnedSemaphorePermit, TankobonError> {
        tokio::select! {
            biased;
            _ = run_token.cancelled() => Err(TankobonError::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => {
                permit.map_err(|_| TankobonError::Cancelled)
            }
        }
    }

    fn spawn(&mut self, index: usize, job: ChapterJob, permit: OwnedSemaphorePermit) {
        let ctx = Arc::clone(&self.ctx);
        let token = self.job_token.clone();
        let guard = InFlightGuard::enter(Arc::clone(&self.in_flight));
        let label = job.label.clone();

        let handle = self.jobs.spawn(async move {
            // dropped in reverse order: the counter falls before the permit is freed
            let _permit = permit;
            let _guard = guard;
            (index, job.run(ctx, token).await)
        });
        self.running.insert(handle.id(), (index, label));
    }
}
