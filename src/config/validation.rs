use crate::config::types::{Config, ImageConfig};
use crate::source::AVAILABLE_SOURCES;
use crate::ConfigError;
use std::path::{Component, Path, PathBuf};

/// Upper bound on concurrently running chapter jobs
const MAX_CONCURRENCY: u32 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_paths(config)?;
    validate_source(&config.source)?;
    validate_concurrency(config.concurrency)?;
    validate_image_config(&config.image)?;
    Ok(())
}

/// Validates the output and staging directories
fn validate_paths(config: &Config) -> Result<(), ConfigError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    if config.staging_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "staging-dir cannot be empty".to_string(),
        ));
    }

    let staging = resolve_path(&config.staging_dir);
    let output = resolve_path(&config.output_dir);
    if output.starts_with(&staging) {
        return Err(ConfigError::Validation(format!(
            "staging-dir {} must not be output-dir {} or one of its parents",
            staging.display(),
            output.display()
        )));
    }

    Ok(())
}

/// Makes a path absolute and resolves `.`, `..` and symlinks
///
/// Directories that do not exist yet are resolved through their closest
/// existing ancestor.
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = match std::env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    };

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other),
        }
    }

    let mut missing = Vec::new();
    let mut existing = lexical.as_path();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |resolved, name| resolved.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return lexical,
        }
    }
}

/// Validates the content source identifier
fn validate_source(source: &str) -> Result<(), ConfigError> {
    if !AVAILABLE_SOURCES.contains(&source) {
        return Err(ConfigError::Validation(format!(
            "source must be one of [{}], got '{}'",
            AVAILABLE_SOURCES.join(", "),
            source
        )));
    }
    Ok(())
}

/// Validates the concurrency limit
fn validate_concurrency(concurrency: u32) -> Result<(), ConfigError> {
    if concurrency < 1 || concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, concurrency
        )));
    }
    Ok(())
}

/// Validates the image transformation settings
fn validate_image_config(image: &ImageConfig) -> Result<(), ConfigError> {
    match (image.width, image.height) {
        (Some(0), _) | (_, Some(0)) => Err(ConfigError::Validation(
            "image width and height must be positive".to_string(),
        )),
        (Some(_), None) | (None, Some(_)) => Err(ConfigError::Validation(
            "image width and height must be set together".to_string(),
        )),
        _ => Ok(()),
    }
}
