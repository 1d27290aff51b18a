use crate::config::types::{find_device, Config};
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::PathBuf;

/// A set of changes requested through `tankobon config`
///
/// Every field is optional; only the fields that are set are applied.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub source: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    pub concurrency: Option<u32>,
    pub color: Option<bool>,
    pub crop: Option<bool>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Name of a device preset that sets both width and height
    pub device: Option<String>,
    /// Remove the resize target entirely
    pub clear_dimensions: bool,
}

impl ConfigUpdate {
    /// Returns true if the update would not change anything
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.output_dir.is_none()
            && self.staging_dir.is_none()
            && self.concurrency.is_none()
            && self.color.is_none()
            && self.crop.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.device.is_none()
            && !self.clear_dimensions
    }

    /// Applies the update on top of `config` and validates the result
    ///
    /// Dimensions are resolved in order: `clear_dimensions`, then the device
    /// preset, then explicit width/height, so `--device x --width 900` keeps
    /// the preset height and overrides the width.
    pub fn apply(self, config: &Config) -> Result<Config, ConfigError> {
        let mut updated = config.clone();

        if let Some(source) = self.source {
            updated.source = source;
        }
        if let Some(output_dir) = self.output_dir {
            updated.output_dir = output_dir;
        }
        if let Some(staging_dir) = self.staging_dir {
            updated.staging_dir = staging_dir;
        }
        if let Some(concurrency) = self.concurrency {
            updated.concurrency = concurrency;
        }
        if let Some(color) = self.color {
            updated.image.color = color;
        }
        if let Some(crop) = self.crop {
            updated.image.crop = crop;
        }

        if self.clear_dimensions {
            updated.image.width = None;
            updated.image.height = None;
        }
        if let Some(name) = self.device {
            let preset = find_device(&name).ok_or(ConfigError::UnknownDevice(name))?;
            updated.image.width = Some(preset.width);
            updated.image.height = Some(preset.height);
        }
        if let Some(width) = self.width {
            updated.image.width = Some(width);
        }
        if let Some(height) = self.height {
            updated.image.height = Some(height);
        }

        validate(&updated)?;
        Ok(updated)
    }
}
