//! Configuration module for Tankobon
//!
//! This module handles loading, validating, updating and saving the TOML
//! configuration file. The configuration is read once per invocation and
//! treated as immutable input to a run.
//!
//! # Example
//!
//! ```no_run
//! use tankobon::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tankobon.toml")).unwrap();
//! println!("Archives go to: {}", config.output_dir.display());
//! ```

mod parser;
mod types;
mod update;
mod validation;

// Re-export types
pub use types::{
    find_device, Config, DevicePreset, ImageConfig, DEFAULT_CONCURRENCY, DEFAULT_SOURCE,
    DEVICE_PRESETS,
};
pub use update::ConfigUpdate;

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, save_config};
pub use validation::validate;
