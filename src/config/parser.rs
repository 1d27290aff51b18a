use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// A missing file is not an error: the defaults are returned instead, so a
/// first run works without any set-up.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to read, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use tankobon::config::load_config;
///
/// let config = load_config(Path::new("tankobon.toml")).unwrap();
/// println!("Concurrency: {}", config.concurrency);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = match read_optional(path)? {
        Some(content) => toml::from_str(&content)?,
        None => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Config::default()
        }
    };

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at start-up so a run can be matched with the settings it used.
/// A missing file hashes as empty content.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = read_optional(path)?.unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Validates and persists a configuration
///
/// The file is written under a temporary name and renamed into place, so an
/// interrupted save never leaves a truncated config behind.
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    validate(config)?;

    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    tracing::info!("Configuration saved to {}", path.display());
    Ok(())
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
