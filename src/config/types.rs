use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifier of the content source used when none is configured
pub const DEFAULT_SOURCE: &str = "weeb_central";

/// Default number of chapters downloaded at the same time
pub const DEFAULT_CONCURRENCY: u32 = 5;

/// Main configuration structure for Tankobon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Root directory for the generated archives
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Root directory for in-progress chapter pages
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Identifier of the content source to download from
    #[serde(default = "default_source")]
    pub source: String,

    /// Maximum number of chapters downloaded concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Page image transformations
    #[serde(default)]
    pub image: ImageConfig,
}

/// Image post-processing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImageConfig {
    /// Keep colour pages; when false every page is converted to grayscale
    #[serde(default = "default_color")]
    pub color: bool,

    /// Trim blank margins around the page content
    #[serde(default)]
    pub crop: bool,

    /// Target width for aspect-preserving resize (requires `height`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Target height for aspect-preserving resize (requires `width`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            staging_dir: default_staging_dir(),
            source: default_source(),
            concurrency: default_concurrency(),
            image: ImageConfig::default(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
            crop: false,
            width: None,
            height: None,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("manga_downloads")
}

fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("tankobon-staging")
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_concurrency() -> u32 {
    DEFAULT_CONCURRENCY
}

fn default_color() -> bool {
    true
}

/// A reading device with a known screen resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePreset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Screen resolutions that `config --device` can apply
pub const DEVICE_PRESETS: &[DevicePreset] = &[DevicePreset {
    name: "boox_go_7",
    width: 1264,
    height: 1680,
}];

/// Looks up a device preset by name (case-insensitive)
pub fn find_device(name: &str) -> Option<&'static DevicePreset> {
    DEVICE_PRESETS
        .iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(name))
}
