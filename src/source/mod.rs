//! Content sources
//!
//! A content source knows how to talk to one manga website: it searches
//! titles, lists the chapters of a title and resolves a chapter into the
//! ordered locators of its page images. The download engine only depends on
//! the `ContentSource` trait; the concrete site is picked from configuration.
//!
//! This module contains:
//! - The `ContentSource` trait and its error type
//! - `Listing`, the ordered name → locator mapping every call returns
//! - The listing retry policy shared by site implementations
//! - The WeebCentral implementation

mod listing;
mod parser;
pub mod retry;
mod weeb_central;

pub use listing::{chapter_number, natural_cmp, Listing};
pub use retry::{IsRetryable, ListingRetryPolicy};
pub use weeb_central::WeebCentral;

use crate::config::Config;
use crate::TankobonError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Identifiers accepted by the `source` configuration key
pub const AVAILABLE_SOURCES: &[&str] = &["weeb_central"];

/// Locator value a site uses when an element has no link
pub const UNAVAILABLE_LOCATOR: &str = "N/A";

/// Returns true if a locator cannot point at any remote resource
pub fn is_unresolvable(locator: &str) -> bool {
    let trimmed = locator.trim();
    trimmed.is_empty() || trimmed == UNAVAILABLE_LOCATOR
}

/// Errors reported by a content source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Nothing found for {0}")]
    NotFound(String),

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<SourceError>,
    },

    #[error("Content source session is not initialized")]
    NotInitialized,
}

/// Capability set of a manga website
///
/// Implementations must be cheap to share (`Arc<dyn ContentSource>`) between
/// chapter jobs; every method takes `&self`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Identifier of this source, as used in configuration
    fn name(&self) -> &str;

    /// Opens the session with the remote site
    async fn initialize(&self) -> Result<(), SourceError>;

    /// Closes the session; calling it more than once is harmless
    async fn release(&self) -> Result<(), SourceError>;

    /// Searches titles by name
    async fn find_titles(&self, query: &str) -> Result<Listing, SourceError>;

    /// Lists the chapters of a title, sorted by chapter number
    async fn list_chapters(&self, title_locator: &str) -> Result<Listing, SourceError>;

    /// Resolves a chapter into its pages, in reading order
    async fn resolve_chapter_pages(&self, chapter_locator: &str) -> Result<Listing, SourceError>;
}

/// Builds the content source named by the configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn ContentSource>)` - The configured source, not yet initialized
/// * `Err(TankobonError::UnknownSource)` - The identifier is not supported
pub fn build_source(config: &Config) -> Result<Arc<dyn ContentSource>, TankobonError> {
    match config.source.as_str() {
        "weeb_central" => Ok(Arc::new(WeebCentral::new()?)),
        other => Err(TankobonError::UnknownSource {
            name: other.to_string(),
            available: AVAILABLE_SOURCES.join(", "),
        }),
    }
}
