//! Per-run staging directory
//!
//! A run never stages pages directly in the configured staging root. It
//! creates a fresh `run-*` directory inside it on first use, and shutdown
//! removes that directory only. Other runs sharing the root, and anything
//! else stored there, are left alone.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;
use tracing::debug;

const RUN_DIR_PREFIX: &str = "run-";

/// The staging directory owned by one run
///
/// Dropping it without calling [`RunStaging::remove`] still deletes the
/// directory.
#[derive(Debug)]
pub struct RunStaging {
    root: PathBuf,
    dir: Mutex<Option<TempDir>>,
}

impl RunStaging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dir: Mutex::new(None),
        }
    }

    /// The configured staging root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the run directory, if it exists
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|dir| dir.path().to_path_buf())
    }

    /// Returns the run directory, creating it and the root on first use
    pub fn ensure(&self) -> io::Result<PathBuf> {
        let mut dir = self.lock();
        if let Some(existing) = dir.as_ref() {
            return Ok(existing.path().to_path_buf());
        }

        std::fs::create_dir_all(&self.root)?;
        let created = tempfile::Builder::new()
            .prefix(RUN_DIR_PREFIX)
            .tempdir_in(&self.root)?;
        debug!("Staging this run in {}", created.path().display());

        let path = created.path().to_path_buf();
        *dir = Some(created);
        Ok(path)
    }

    /// Removes the run directory
    ///
    /// # Returns
    ///
    /// * `Ok(Some(path))` - The run directory that was removed
    /// * `Ok(None)` - No run directory was ever created
    /// * `Err(e)` - Removal failed; the directory is not retried
    pub async fn remove(&self) -> io::Result<Option<PathBuf>> {
        let taken = self.lock().take();
        let Some(dir) = taken else {
            return Ok(None);
        };

        let path = dir.path().to_path_buf();
        tokio::task::spawn_blocking(move || dir.close())
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))??;
        Ok(Some(path))
    }

    fn lock(&self) -> MutexGuard<'_, Option<TempDir>> {
        self.dir.lock().unwrap_or_else(|e| e.into_inner())
    }
}
