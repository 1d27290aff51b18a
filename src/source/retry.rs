//! Retry logic for listing calls
//!
//! Searching titles, listing chapters and resolving pages hit the site once
//! per call and may hit a transient failure. Those calls are retried with
//! exponential backoff. This is unrelated to page image downloads, which have
//! their own fixed-attempt policy in the download fetcher.

use crate::source::SourceError;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, 5xx, 429) should return
/// `true`. Permanent failures (404, unparsable page, bad locator) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for SourceError {
    fn is_retryable(&self) -> bool {
        match self {
            SourceError::Http { source, .. } => source.is_timeout() || source.is_connect(),
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            SourceError::Parse { .. }
            | SourceError::NotFound(_)
            | SourceError::InvalidLocator(_)
            | SourceError::RetriesExhausted { .. }
            | SourceError::NotInitialized => false,
        }
    }
}

/// Exponential backoff policy for listing calls
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Factor applied to the delay after every failed attempt
    pub multiplier: f64,
}

impl Default for ListingRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            multiplier: 2.0,
        }
    }
}

impl ListingRetryPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Runs `operation` until it succeeds, fails permanently, or runs out of attempts
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The first successful result
    /// * `Err(e)` - A non-retryable error, returned as-is
    /// * `Err(SourceError::RetriesExhausted)` - Every attempt failed with a retryable error
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!("{} failed after {} attempts: {}", what, attempt, e);
                    return Err(SourceError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    tracing::debug!(
                        "{} attempt {}/{} failed ({}), retrying in {:?}",
                        what,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
