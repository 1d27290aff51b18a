//! Cancellation and teardown

use crate::common::{dir_entries, image_server, pages, runner, test_config, MockSource, TITLE};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tankobon::download::{ChapterError, ChapterSelection, RunStaging, ShutdownCoordinator};
use tankobon::output::ChapterOutcome;
use tankobon::progress::Progress;
use tankobon::source::ContentSource;
use tankobon::{JobStatus, TankobonError};
use tempfile::TempDir;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_cancellation_releases_source_once_and_removes_staging() {
    let dir = TempDir::new().unwrap();
    let server = image_server(20, 20).await;
    let source = Arc::new(
        MockSource::new()
            .with_resolve_delay(Duration::from_secs(30))
            .with_chapter("Ch. 1", "c1", pages(&server, "c1", 1))
            .with_chapter("Ch. 2", "c2", pages(&server, "c2", 1))
            .with_chapter("Ch. 3", "c3", pages(&server, "c3", 1)),
    );

    // files of another run in the same staging root are not ours to remove
    let staging = dir.path().join("staging");
    let foreign = staging.join("run-other").join(TITLE).join("Ch. 9");
    std::fs::create_dir_all(&foreign).unwrap();
    std::fs::write(foreign.join("Page 1.png"), b"x").unwrap();

    let token = CancellationToken::new();
    let mut runner = runner(test_config(dir.path(), 2), &source, token.clone());

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        runner.install(TITLE, &source.chapters(), ChapterSelection::All),
    )
    .await
    .expect("install should stop promptly after cancellation");
    assert!(matches!(result, Err(TankobonError::Cancelled)));

    let closed = runner.close().await;
    assert!(matches!(closed, Err(TankobonError::Cancelled)));
    assert_eq!(source.releases(), 1);
    assert_eq!(dir_entries(&staging), vec!["run-other"]);
    assert!(foreign.join("Page 1.png").exists());
    assert!(!dir.path().join("out").join(TITLE).exists());

    // a second close is a no-op
    assert!(matches!(runner.close().await, Err(TankobonError::Cancelled)));
    assert_eq!(source.releases_started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_close_after_search_releases_once() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MockSource::new());
    let mut runner = runner(test_config(dir.path(), 1), &source, CancellationToken::new());

    let titles = runner.search(TITLE).await.unwrap();
    assert_eq!(titles.len(), 1);
    assert!(matches!(
        runner.search("Vagabond").await,
        Err(TankobonError::NoTitles(_))
    ));

    let report = runner.close().await.unwrap();
    assert_eq!(report.jobs_drained, 0);
    assert!(report.source_released);
    assert!(report.is_clean());
    assert_eq!(source.releases(), 1);
    assert_eq!(source.initializations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shutdown_drains_outstanding_jobs() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MockSource::new());
    let run_token = CancellationToken::new();
    let job_token = run_token.child_token();

    let staging = Arc::new(RunStaging::new(dir.path().join("staging")));
    let run_dir = staging.ensure().unwrap();
    let coordinator = ShutdownCoordinator::new(
        source.clone() as Arc<dyn ContentSource>,
        Arc::clone(&staging),
        run_token.clone(),
        job_token.clone(),
    );

    let mut jobs = JoinSet::new();
    for index in 0..3 {
        let token = job_token.clone();
        jobs.spawn(async move {
            token.cancelled().await;
            (
                index,
                ChapterOutcome::failed(format!("Ch. {}", index), 0, ChapterError::Cancelled),
            )
        });
    }

    let progress = Progress::hidden();
    progress.start("Downloading");

    let report = coordinator.shutdown(&mut jobs, &progress).await.clone();
    assert_eq!(report.jobs_drained, 3);
    assert_eq!(report.jobs_panicked, 0);
    assert!(report.source_released);
    assert!(report.staging_removed);
    assert!(!run_dir.exists());
    assert!(dir.path().join("staging").exists());
    assert!(!report.cancelled);
    assert!(!progress.is_active());
    assert!(job_token.is_cancelled());
    assert!(!run_token.is_cancelled());

    let again = coordinator.shutdown(&mut jobs, &progress).await;
    assert_eq!(*again, report);
    assert!(coordinator.is_done());
    assert_eq!(source.releases(), 1);
}

#[tokio::test]
async fn test_shutdown_records_panicked_job() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MockSource::new());
    let run_token = CancellationToken::new();
    let coordinator = ShutdownCoordinator::new(
        source.clone() as Arc<dyn ContentSource>,
        Arc::new(RunStaging::new(dir.path().join("staging"))),
        run_token.clone(),
        run_token.child_token(),
    );

    let mut jobs: JoinSet<(usize, ChapterOutcome)> = JoinSet::new();
    jobs.spawn(async { panic!("decoder blew up") });

    let report = coordinator
        .shutdown(&mut jobs, &Progress::hidden())
        .await
        .clone();

    assert_eq!(report.jobs_drained, 1);
    assert_eq!(report.jobs_panicked, 1);
    assert!(!report.is_clean());
    assert!(report.source_released);
}

#[tokio::test]
async fn test_release_survives_dropped_caller() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MockSource::new().with_release_delay(Duration::from_millis(300)));
    let run_token = CancellationToken::new();
    let coordinator = ShutdownCoordinator::new(
        source.clone() as Arc<dyn ContentSource>,
        Arc::new(RunStaging::new(dir.path().join("staging"))),
        run_token.clone(),
        run_token.child_token(),
    );

    let mut jobs: JoinSet<(usize, ChapterOutcome)> = JoinSet::new();
    let progress = Progress::hidden();

    // the caller gives up long before the release finishes
    let dropped = tokio::time::timeout(
        Duration::from_millis(50),
        coordinator.shutdown(&mut jobs, &progress),
    )
    .await;
    assert!(dropped.is_err());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(source.releases_started.load(Ordering::SeqCst), 1);
    assert_eq!(source.releases(), 1);

    // a restarted shutdown reuses the finished release
    let report = coordinator.shutdown(&mut jobs, &progress).await;
    assert!(report.source_released);
    assert_eq!(source.releases_started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_during_shutdown_is_reported() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MockSource::new().with_release_delay(Duration::from_millis(200)));
    let run_token = CancellationToken::new();
    let coordinator = ShutdownCoordinator::new(
        source.clone() as Arc<dyn ContentSource>,
        Arc::new(RunStaging::new(dir.path().join("staging"))),
        run_token.clone(),
        run_token.child_token(),
    );

    let canceller = run_token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let mut jobs: JoinSet<(usize, ChapterOutcome)> = JoinSet::new();
    let report = coordinator
        .shutdown(&mut jobs, &Progress::hidden())
        .await
        .clone();

    // the release is not interrupted, but the run counts as cancelled
    assert!(report.source_released);
    assert!(report.cancelled);
    assert_eq!(source.releases(), 1);
}

#[tokio::test]
async fn test_staging_root_above_output_keeps_archives() {
    let dir = TempDir::new().unwrap();
    let server = image_server(20, 20).await;
    let source = Arc::new(MockSource::new().with_chapter("Ch. 1", "c1", pages(&server, "c1", 1)));

    let mut config = test_config(dir.path(), 1);
    config.staging_dir = dir.path().to_path_buf();
    let mut runner = runner(config, &source, CancellationToken::new());

    let summary = runner
        .install(TITLE, &source.chapters(), ChapterSelection::All)
        .await
        .unwrap();
    let archive = summary.outcomes[0].archive.clone().unwrap();
    assert!(archive.exists());

    let report = runner.close().await.unwrap();
    assert!(report.staging_removed);
    assert!(archive.exists());
    assert_eq!(dir_entries(dir.path()), vec!["out"]);
}

#[tokio::test]
async fn test_runs_sharing_a_staging_root_do_not_interfere() {
    let dir = TempDir::new().unwrap();
    let server = image_server(20, 20).await;

    let mut broken = pages(&server, "c1", 1);
    broken.insert("Page 2", "N/A");
    let first_source = Arc::new(MockSource::new().with_chapter("Ch. 1", "c1", broken));
    let second_source =
        Arc::new(MockSource::new().with_chapter("Ch. 2", "c2", pages(&server, "c2", 1)));

    let mut first = runner(test_config(dir.path(), 1), &first_source, CancellationToken::new());
    let mut second = runner(test_config(dir.path(), 1), &second_source, CancellationToken::new());

    let summary = first
        .install(TITLE, &first_source.chapters(), ChapterSelection::All)
        .await
        .unwrap();
    assert_eq!(summary.outcomes[0].status, JobStatus::Failed);
    let kept = first.staging_dir().unwrap().join(TITLE).join("Ch. 1");
    assert!(kept.join("Page 1.png").exists());

    second
        .install(TITLE, &second_source.chapters(), ChapterSelection::All)
        .await
        .unwrap();
    assert_ne!(first.staging_dir(), second.staging_dir());
    second.close().await.unwrap();

    // the second run finishing leaves the first run's pages in place
    assert!(kept.join("Page 1.png").exists());

    first.close().await.unwrap();
    assert!(!kept.exists());
    assert!(dir_entries(&dir.path().join("staging")).is_empty());
}
