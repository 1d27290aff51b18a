//! Page image post-processing
//!
//! Every downloaded page goes through the same fixed pipeline before it is
//! archived: optional grayscale conversion, optional content-aware crop and
//! optional aspect-preserving resize. The pipeline is deterministic; the same
//! input file and configuration always produce the same output file.

mod crop;
mod resize;

pub use crop::{content_bounds, Bounds, BACKGROUND_THRESHOLD, CROP_PADDING};
pub use resize::fit_dimensions;

use crate::config::ImageConfig;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while transforming a page image
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid target dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable image settings, snapshotted once per chapter job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransformConfig {
    /// Keep colour; `false` converts pages to grayscale
    pub color: bool,
    /// Crop white margins around the page content
    pub crop: bool,
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
}

impl ImageTransformConfig {
    /// Target box for resizing, present only when both dimensions are set
    pub fn target(&self) -> Option<(u32, u32)> {
        match (self.target_width, self.target_height) {
            (Some(width), Some(height)) => Some((width, height)),
            _ => None,
        }
    }

    /// Returns true when processing would leave the file untouched
    pub fn is_identity(&self) -> bool {
        self.color && !self.crop && self.target().is_none()
    }
}

impl Default for ImageTransformConfig {
    fn default() -> Self {
        Self {
            color: true,
            crop: false,
            target_width: None,
            target_height: None,
        }
    }
}

impl From<&ImageConfig> for ImageTransformConfig {
    fn from(config: &ImageConfig) -> Self {
        Self {
            color: config.color,
            crop: config.crop,
            target_width: config.width,
            target_height: config.height,
        }
    }
}

/// Applies the page pipeline to image files on disk
#[derive(Debug, Clone, Copy)]
pub struct PostProcessor {
    threshold: u8,
    padding: u32,
    filter: FilterType,
}

impl PostProcessor {
    pub fn new() -> Self {
        Self {
            threshold: BACKGROUND_THRESHOLD,
            padding: CROP_PADDING,
            filter: FilterType::Lanczos3,
        }
    }

    /// Transforms the image at `path` in place
    ///
    /// Steps run in a fixed order: grayscale (when `color` is off), crop
    /// (when `crop` is on), resize (when both target dimensions are set).
    /// The result is re-encoded in the format implied by the file extension
    /// and swapped in through a temporary file.
    ///
    /// This is blocking work; async callers should use
    /// `tokio::task::spawn_blocking`.
    pub fn process(&self, path: &Path, config: &ImageTransformConfig) -> Result<(), ProcessError> {
        if config.is_identity() {
            return Ok(());
        }

        let mut img = self.decode(path)?;

        if !config.color {
            img = img.grayscale();
        }

        if config.crop {
            img = self.crop(img);
        }

        if let Some((width, height)) = config.target() {
            let (new_width, new_height) = fit_dimensions(img.width(), img.height(), width, height)?;
            img = img.resize_exact(new_width, new_height, self.filter);
        }

        debug!(
            "Processed {} -> {}x{}",
            path.display(),
            img.width(),
            img.height()
        );

        self.encode(&img, path)
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage, ProcessError> {
        let reader = image::io::Reader::open(path).map_err(|source| ProcessError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // Sources sometimes serve JPEG or WebP bytes under a .png name
        let reader = reader.with_guessed_format().map_err(|source| ProcessError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        reader.decode().map_err(|source| ProcessError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    fn crop(&self, img: DynamicImage) -> DynamicImage {
        let gray = img.to_luma8();
        match content_bounds(&gray, self.threshold, self.padding) {
            Some(bounds) => img.crop_imm(bounds.x, bounds.y, bounds.width, bounds.height),
            None => img,
        }
    }

    fn encode(&self, img: &DynamicImage, path: &Path) -> Result<(), ProcessError> {
        let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
        let tmp_path = temp_path(path);

        if let Err(source) = img.save_with_format(&tmp_path, format) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(ProcessError::Encode {
                path: path.to_path_buf(),
                source,
            });
        }

        std::fs::rename(&tmp_path, path).map_err(|source| ProcessError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
