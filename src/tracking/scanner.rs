//! Directory scanner that builds a [`Snapshot`] of the tracked root.
//!
//! The scanner walks the whole tree below the root, skipping the metadata
//! directory at the top level and any entry matched by the configured ignore
//! patterns, and records every regular file by its forward-slash relative
//! path.

use crate::METADATA_DIR;
use crate::config::Config;
use crate::error::{FmError, Result};
use crate::storage::{FileRecord, Snapshot};
use crate::utils::IgnoreSet;
use crate::utils::paths::to_record_path;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Result of one walk over the tracked root.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Every regular file found
    pub snapshot: Snapshot,
    /// Symlinks that were not followed and therefore not recorded
    pub skipped_links: Vec<String>,
}

/// Scanner for enumerating files under the tracked root
pub struct DirectoryScanner {
    /// Root of the tracked tree
    root: PathBuf,
    /// Patterns to ignore during scanning
    ignore: IgnoreSet,
    /// Whether to follow symbolic links
    follow_symlinks: bool,
}

impl DirectoryScanner {
    /// Create a new directory scanner
    ///
    /// # Arguments
    ///
    /// * `root` - Tracked root to walk
    /// * `ignore` - Compiled exclusion patterns
    /// * `follow_symlinks` - Whether to follow symbolic links
    #[must_use]
    pub const fn new(root: PathBuf, ignore: IgnoreSet, follow_symlinks: bool) -> Self {
        Self {
            root,
            ignore,
            follow_symlinks,
        }
    }

    /// Create a scanner using the `[tracking]` section of `config`
    ///
    /// # Errors
    ///
    /// Returns [`FmError::Config`] if an ignore pattern is invalid.
    pub fn from_config(root: PathBuf, config: &Config) -> Result<Self> {
        Ok(Self::new(
            root,
            config.ignore_set()?,
            config.tracking.follow_symlinks,
        ))
    }

    /// Walk the root and record every regular file
    ///
    /// # Errors
    ///
    /// Returns [`FmError::IoFailure`] if:
    /// - A directory cannot be read (for example, permission denied)
    /// - A followed symlink is broken or forms a loop
    /// - A path is not valid UTF-8
    pub fn scan(&self) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        let walker = WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !self.should_skip_entry(e));

        for entry in walker {
            let entry = entry.map_err(|e| self.walk_error(e))?;
            let file_type = entry.file_type();

            if file_type.is_dir() {
                continue;
            }

            let record_path = self.record_path(entry.path())?;

            if file_type.is_file() {
                report.snapshot.insert(FileRecord::new(record_path));
            } else if file_type.is_symlink() {
                tracing::warn!(path = %record_path, "skipping symlink (follow_symlinks = false)");
                report.skipped_links.push(record_path);
            } else {
                tracing::debug!(path = %record_path, "skipping special file");
            }
        }

        tracing::debug!(
            files = report.snapshot.len(),
            skipped_links = report.skipped_links.len(),
            root = %self.root.display(),
            "scanned tracked root"
        );
        Ok(report)
    }

    /// Check if a directory entry should be skipped
    fn should_skip_entry(&self, entry: &walkdir::DirEntry) -> bool {
        if entry.depth() == 1 && entry.file_name() == METADATA_DIR {
            return true;
        }
        if self.ignore.is_empty() {
            return false;
        }
        to_record_path(entry.path(), &self.root)
            .is_some_and(|path| self.ignore.should_ignore(&path))
    }

    fn record_path(&self, path: &std::path::Path) -> Result<String> {
        to_record_path(path, &self.root).ok_or_else(|| {
            FmError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "path is not valid UTF-8 relative to the tracked root",
                ),
            )
        })
    }

    fn walk_error(&self, err: walkdir::Error) -> FmError {
        let path = err
            .path()
            .map_or_else(|| self.root.clone(), std::path::Path::to_path_buf);
        let message = err.to_string();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other(message));
        FmError::io(path, source)
    }
}
