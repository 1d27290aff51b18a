//! Tankobon: a concurrent manga chapter downloader
//!
//! This crate fetches the pages of manga chapters from a content source,
//! post-processes every page image and bundles each chapter into a CBZ archive,
//! running many chapter jobs concurrently with clean cancellation and teardown.

pub mod archive;
pub mod config;
pub mod download;
pub mod output;
pub mod postprocess;
pub mod progress;
pub mod source;
pub mod state;

use thiserror::Error;

/// Main error type for Tankobon operations
#[derive(Debug, Error)]
pub enum TankobonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid chapter selection: {0}")]
    Selection(#[from] SelectionError),

    #[error("Content source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown content source '{name}' (available: {available})")]
    UnknownSource { name: String, available: String },

    #[error("No title matched '{0}'")]
    NoTitles(String),

    #[error("No title at index '{pick}' ({available} available)")]
    InvalidPick { pick: String, available: usize },

    #[error("Run cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown device preset: {0}")]
    UnknownDevice(String),
}

/// Chapter selection errors, raised before any job is created
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("expected a chapter number (e.g. 5), a range (e.g. 9-18) or 'all', got '{0}'")]
    Syntax(String),

    #[error("chapter positions start at 1, got {0}")]
    ZeroPosition(usize),

    #[error("range start {start} is greater than range end {end}")]
    InvertedRange { start: usize, end: usize },

    #[error("selection matches none of the {available} available chapters")]
    Empty { available: usize },
}

/// Result type alias for Tankobon operations
pub type Result<T> = std::result::Result<T, TankobonError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use download::{ChapterSelection, Runner};
pub use output::{RunStatus, RunSummary};
pub use state::JobStatus;
