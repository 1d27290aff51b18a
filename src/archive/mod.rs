//! CBZ archive writer
//!
//! A chapter archive is either absent or complete at its final name. The zip
//! is streamed into `<name>.part` next to the final path and renamed into
//! place only after the central directory has been flushed.

use crate::source::natural_cmp;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::ZipWriter;

/// File extension of chapter archives
pub const ARCHIVE_EXTENSION: &str = "cbz";

/// Errors raised while packaging a staging directory
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("staging directory {0} holds no pages")]
    Empty(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("zip error on {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Final path of a chapter archive inside `output_dir`
pub fn archive_path(output_dir: &Path, archive_name: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", archive_name, ARCHIVE_EXTENSION))
}

/// Packages staging directories into CBZ files
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveWriter;

impl ArchiveWriter {
    pub fn new() -> Self {
        Self
    }

    /// Writes every regular file of `staging_dir` into
    /// `output_dir/<archive_name>.cbz`
    ///
    /// Entries are named after their file names and ordered naturally, so
    /// `Page 2` comes before `Page 10`. The output directory is created when
    /// missing. On failure the partial file is removed and `staging_dir` is
    /// left untouched.
    ///
    /// This is blocking work; async callers should use
    /// `tokio::task::spawn_blocking`.
    pub fn write(
        &self,
        staging_dir: &Path,
        output_dir: &Path,
        archive_name: &str,
    ) -> Result<PathBuf, ArchiveError> {
        let pages = collect_pages(staging_dir)?;
        if pages.is_empty() {
            return Err(ArchiveError::Empty(staging_dir.to_path_buf()));
        }

        std::fs::create_dir_all(output_dir).map_err(|source| ArchiveError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let final_path = archive_path(output_dir, archive_name);
        let part_path = output_dir.join(format!("{}.{}.part", archive_name, ARCHIVE_EXTENSION));

        if let Err(e) = write_zip(&part_path, &pages) {
            if let Err(cleanup) = std::fs::remove_file(&part_path) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove partial archive {}: {}", part_path.display(), cleanup);
                }
            }
            return Err(e);
        }

        std::fs::rename(&part_path, &final_path).map_err(|source| ArchiveError::Io {
            path: final_path.clone(),
            source,
        })?;

        info!("Wrote {} ({} pages)", final_path.display(), pages.len());
        Ok(final_path)
    }
}

/// Lists regular files of a staging directory in natural name order
fn collect_pages(staging_dir: &Path) -> Result<Vec<(String, PathBuf)>, ArchiveError> {
    let io_err = |source| ArchiveError::Io {
        path: staging_dir.to_path_buf(),
        source,
    };

    let mut pages = Vec::new();
    for entry in std::fs::read_dir(staging_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        // leftovers of an interrupted fetch or encode
        if name.ends_with(".part") || name.ends_with(".tmp") {
            continue;
        }
        pages.push((name, entry.path()));
    }

    pages.sort_by(|a, b| natural_cmp(&a.0, &b.0));
    Ok(pages)
}

fn write_zip(part_path: &Path, pages: &[(String, PathBuf)]) -> Result<(), ArchiveError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ArchiveError::Io { path, source }
    };
    let zip_err = |source| ArchiveError::Zip {
        path: part_path.to_path_buf(),
        source,
    };

    let file = File::create(part_path).map_err(io_err(part_path))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    for (name, path) in pages {
        debug!("Adding {} to {}", name, part_path.display());
        zip.start_file(name.as_str(), FileOptions::default())
            .map_err(zip_err)?;
        let mut page = File::open(path).map_err(io_err(path.as_path()))?;
        io::copy(&mut page, &mut zip).map_err(io_err(part_path))?;
    }

    zip.finish()
        .map_err(zip_err)?
        .into_inner()
        .map_err(|e| ArchiveError::Io {
            path: part_path.to_path_buf(),
            source: e.into_error(),
        })?
        .sync_all()
        .map_err(io_err(part_path))
}
