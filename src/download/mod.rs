//! Chapter downloading
//!
//! This module contains the core download pipeline, including:
//! - Chapter selection
//! - Page fetching with timeout-only retries
//! - Chapter jobs (fetch, post-process, archive)
//! - Bounded-concurrency job scheduling
//! - Per-run staging directories
//! - Shutdown and cancellation

mod errors;
mod fetcher;
mod job;
mod runner;
mod scheduler;
mod selection;
mod shutdown;
mod staging;

pub use errors::{ChapterError, FailureKind, PageError};
pub use fetcher::{
    build_image_client, FetchPolicy, ImageFetcher, PageFetchTask, DEFAULT_ATTEMPT_TIMEOUT,
    DEFAULT_MAX_ATTEMPTS,
};
pub use job::{sanitize_component, ChapterJob, JobContext, PAGE_EXTENSION};
pub use runner::Runner;
pub use scheduler::{ChapterJobScheduler, IndexedOutcome};
pub use selection::{select_chapters, ChapterSelection};
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
pub use staging::RunStaging;
