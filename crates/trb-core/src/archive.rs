//! Deterministic zip assembly.
//!
//! Archive formats store per-entry modification times and emit members
//! in insertion order, so a naive walk-and-zip produces different bytes
//! on every run and every filesystem. [`DeterministicZip`] removes both
//! degrees of freedom: every entry carries the release's fixed build
//! time, and directory walks are sorted by relative path before
//! anything is written. Entries stream straight into the writer, so
//! there is no member-count ceiling to work around.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use trb_schema::BuildTimestamp;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot archive {path}: {source}")]
    Entry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Streaming zip builder with normalized entry metadata.
pub struct DeterministicZip {
    writer: zip::ZipWriter<std::fs::File>,
    options: SimpleFileOptions,
}

impl std::fmt::Debug for DeterministicZip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeterministicZip").finish_non_exhaustive()
    }
}

impl DeterministicZip {
    /// Open a new archive at `path`. Every entry will carry the given
    /// build time (clamped to the zip format's 1980 floor when older).
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Entry`] if the file cannot be created.
    pub fn create(path: &Path, timestamp: BuildTimestamp) -> Result<Self, ArchiveError> {
        let file = std::fs::File::create(path).map_err(|source| ArchiveError::Entry {
            path: path.to_path_buf(),
            source,
        })?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip_time(timestamp));
        Ok(Self {
            writer: zip::ZipWriter::new(file),
            options,
        })
    }

    /// Append one file under the given member name and unix mode.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Entry`] if the input cannot be read and
    /// [`ArchiveError::Zip`] / [`ArchiveError::Io`] on write failures.
    pub fn append_file(&mut self, name: &str, path: &Path, mode: u32) -> Result<(), ArchiveError> {
        let mut file = std::fs::File::open(path).map_err(|source| ArchiveError::Entry {
            path: path.to_path_buf(),
            source,
        })?;
        self.writer
            .start_file(name, self.options.unix_permissions(mode))?;
        std::io::copy(&mut file, &mut self.writer)?;
        Ok(())
    }

    /// Append every file below `root` (no directory entries), member
    /// names relative to `root`, in sorted relative-path order.
    /// Version-control metadata (`.git` directories and gitlink files)
    /// is excluded.
    ///
    /// # Errors
    ///
    /// Fails on unreadable directory entries or any error
    /// [`DeterministicZip::append_file`] can produce.
    pub fn append_dir_sorted(&mut self, root: &Path) -> Result<(), ArchiveError> {
        let mut members: Vec<(String, PathBuf)> = Vec::new();
        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(std::io::Error::other)?;
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            members.push((name, entry.path().to_path_buf()));
        }

        // Sorted member order is part of the output contract; the raw
        // walk order depends on the filesystem.
        members.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, path) in &members {
            self.append_file(name, path, 0o644)?;
        }
        Ok(())
    }

    /// Finalize the central directory and flush the archive.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Zip`] if the trailer cannot be written.
    pub fn finish(mut self) -> Result<(), ArchiveError> {
        let mut file = self.writer.finish()?;
        file.flush().map_err(ArchiveError::Io)?;
        Ok(())
    }
}

/// Convert the build time to a zip header time, clamping anything the
/// DOS format cannot represent (pre-1980) to its floor.
fn zip_time(timestamp: BuildTimestamp) -> zip::DateTime {
    use chrono::{Datelike, Timelike};
    let dt = timestamp.datetime();
    zip::DateTime::from_date_and_time(
        dt.year() as u16,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
    )
    .unwrap_or_default()
}
