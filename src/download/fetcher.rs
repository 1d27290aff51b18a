//! Page image fetcher
//!
//! Downloads one page image to a local path. Each attempt is bounded by a
//! timeout that covers both the request and the body. Only timeouts are
//! retried; any other failure (including an HTTP error status) fails the page
//! at once. Bytes land in `<dest>.part` first and are renamed onto `dest`, so
//! a truncated page is never visible under its final name.

use crate::download::errors::PageError;
use crate::source::is_unresolvable;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default number of attempts per page
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default timeout of a single attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Retry bounds for page downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

/// One page to download, owned by a single chapter job
#[derive(Debug, Clone)]
pub struct PageFetchTask {
    pub name: String,
    pub locator: String,
    pub dest: PathBuf,
    /// Attempts made so far
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl PageFetchTask {
    pub fn new(name: impl Into<String>, locator: impl Into<String>, dest: PathBuf) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
            dest,
            attempts: 0,
            last_error: None,
        }
    }
}

/// Builds the HTTP client used for page images
pub fn build_image_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("tankobon/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloads page images with bounded, timeout-only retries
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    policy: FetchPolicy,
}

impl ImageFetcher {
    pub fn new(policy: FetchPolicy) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_image_client()?, policy))
    }

    pub fn with_client(client: Client, policy: FetchPolicy) -> Self {
        Self { client, policy }
    }

    /// Fetches `task.locator` into `task.dest`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The page is complete at `task.dest`
    /// * `Err(PageError::UnresolvableLocator)` - Sentinel locator, no request made
    /// * `Err(PageError::RetriesExhausted)` - Every attempt timed out
    /// * `Err(PageError::Transport)` - Non-timeout failure, not retried
    /// * `Err(PageError::Cancelled)` - `cancel` fired
    pub async fn fetch(
        &self,
        task: &mut PageFetchTask,
        cancel: &CancellationToken,
    ) -> Result<(), PageError> {
        if is_unresolvable(&task.locator) {
            return Err(PageError::UnresolvableLocator(task.locator.clone()));
        }

        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            task.attempts = attempt;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PageError::Cancelled),
                outcome = tokio::time::timeout(self.policy.attempt_timeout, self.download(&task.locator)) => outcome,
            };

            match outcome {
                Ok(Ok(bytes)) => {
                    write_atomically(&task.dest, &bytes).await?;
                    debug!(
                        "Fetched {} ({} bytes, attempt {})",
                        task.name,
                        bytes.len(),
                        attempt
                    );
                    return Ok(());
                }
                Ok(Err(e)) if e.is_timeout() => {
                    warn!("Attempt {}/{} for {} timed out: {}", attempt, max_attempts, task.name, e);
                    task.last_error = Some(e.to_string());
                }
                Ok(Err(e)) => {
                    task.last_error = Some(e.to_string());
                    return Err(PageError::Transport(e.to_string()));
                }
                Err(_) => {
                    warn!(
                        "Attempt {}/{} for {} timed out after {:?}",
                        attempt, max_attempts, task.name, self.policy.attempt_timeout
                    );
                    task.last_error = Some(format!(
                        "timed out after {:?}",
                        self.policy.attempt_timeout
                    ));
                }
            }
        }

        Err(PageError::RetriesExhausted {
            attempts: max_attempts,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

async fn write_atomically(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut part = dest.as_os_str().to_os_string();
    part.push(".part");
    let part = PathBuf::from(part);

    tokio::fs::write(&part, bytes).await?;
    tokio::fs::rename(&part, dest).await
}
