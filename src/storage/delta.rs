use super::{EncodedRecord, FileRecord, encode_record, read_record};
use crate::error::{FmError, IoContext, Result};
use crate::utils::paths::{ensure_parent_dirs, from_record_path};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Extension of delta record files.
const DELTA_EXT: &str = "bin";

/// The change recorded by one commit.
///
/// A modified file appears twice: its old record in `removed` and its new
/// record in `added`, under the same path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Version this delta produced (1 for the first commit)
    pub version: u64,
    /// Commit time, seconds since the Unix epoch
    pub created_at: i64,
    /// Records present only in the new snapshot, sorted by path
    pub added: Vec<FileRecord>,
    /// Records present only in the old snapshot, sorted by path
    pub removed: Vec<FileRecord>,
}

impl Delta {
    /// Creates a delta, sorting both sides by path.
    #[must_use]
    pub fn new(
        version: u64,
        created_at: i64,
        mut added: Vec<FileRecord>,
        mut removed: Vec<FileRecord>,
    ) -> Self {
        added.sort_by(|a, b| a.path.cmp(&b.path));
        removed.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            version,
            created_at,
            added,
            removed,
        }
    }

    /// Whether the delta records no change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Renders the delta for humans.
    ///
    /// The short form is a one-line count; the detailed form lists removed
    /// and then added records, one `path | size | digest` line each.
    #[must_use]
    pub fn render(&self, detailed: bool) -> String {
        if !detailed {
            return format!(
                "{} files added and {} files removed.",
                self.added.len(),
                self.removed.len()
            );
        }

        let mut sections = Vec::new();
        for (label, records) in [("removed", &self.removed), ("added", &self.added)] {
            if records.is_empty() {
                continue;
            }
            let mut section = format!("{} files {label}:", records.len());
            for record in records {
                let _ = write!(section, "\n{record}");
            }
            sections.push(section);
        }
        sections.join("\n")
    }

    /// Materializes the added files under `destination`.
    ///
    /// `destination` is removed and recreated first, so it ends up holding
    /// exactly this delta's added files. Each file is hard-linked from
    /// `source_root` when `use_hard_links` is set and copied otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::IoFailure`] if the directory cannot be rebuilt or
    /// any file cannot be linked or copied.
    pub fn export(&self, destination: &Path, source_root: &Path, use_hard_links: bool) -> Result<()> {
        if destination.exists() {
            fs::remove_dir_all(destination).at_path(destination)?;
        }
        fs::create_dir_all(destination).at_path(destination)?;

        for record in &self.added {
            let src = from_record_path(source_root, &record.path);
            let dst = from_record_path(destination, &record.path);
            ensure_parent_dirs(&dst)?;
            link_or_copy(&src, &dst, use_hard_links)?;
        }

        tracing::debug!(
            files = self.added.len(),
            destination = %destination.display(),
            "exported added files"
        );
        Ok(())
    }
}

/// Hard-links `src` to `dst`, or copies it.
///
/// A symlinked source is resolved first so the export holds the content
/// rather than a link that may dangle outside the tree. A resolved source on
/// another filesystem cannot be hard-linked and is copied instead.
fn link_or_copy(src: &Path, dst: &Path, use_hard_links: bool) -> Result<()> {
    let src = if fs::symlink_metadata(src).at_path(src)?.file_type().is_symlink() {
        fs::canonicalize(src).at_path(src)?
    } else {
        src.to_path_buf()
    };

    if use_hard_links {
        match fs::hard_link(&src, dst) {
            Ok(()) => return Ok(()),
            Err(e) if needs_copy_fallback(&e) => {
                tracing::debug!(
                    source = %src.display(),
                    error = %e,
                    "hard link crosses filesystems, copying instead"
                );
            }
            Err(e) => return Err(FmError::io(&src, e)),
        }
    }
    fs::copy(&src, dst).at_path(&src)?;
    Ok(())
}

/// Whether a failed hard link should be retried as a copy.
fn needs_copy_fallback(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

/// Append-only store of deltas, one file per version.
pub struct DeltaLog {
    dir: PathBuf,
    compression_level: i32,
}

impl DeltaLog {
    /// Creates a log rooted at `dir`.
    #[must_use]
    pub const fn new(dir: PathBuf, compression_level: i32) -> Self {
        Self {
            dir,
            compression_level,
        }
    }

    fn path_for(&self, version: u64) -> PathBuf {
        self.dir.join(format!("{version}.{DELTA_EXT}"))
    }

    /// Encodes a delta for its version without writing it.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::CorruptState`] if the delta is empty, its version
    /// is already recorded or it cannot be encoded.
    pub fn encode(&self, delta: &Delta) -> Result<EncodedRecord> {
        if delta.is_empty() {
            return Err(FmError::corrupt(format!(
                "refusing to record empty delta for version {}",
                delta.version
            )));
        }
        let path = self.path_for(delta.version);
        if path.exists() {
            return Err(FmError::corrupt(format!(
                "delta for version {} already exists",
                delta.version
            )));
        }
        encode_record(&path, delta, self.compression_level)
    }

    /// Persists a delta under its version.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::CorruptState`] if the delta is empty or its version
    /// is already recorded, and an I/O error if the write fails.
    pub fn save(&self, delta: &Delta) -> Result<()> {
        self.encode(delta)?.write()
    }

    /// Loads the delta recorded for `version`.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::CorruptState`] if the file is missing, undecodable
    /// or holds a different version.
    pub fn load(&self, version: u64) -> Result<Delta> {
        let delta: Delta = read_record(&self.path_for(version))?;
        if delta.version != version {
            return Err(FmError::corrupt(format!(
                "delta file for version {version} records version {}",
                delta.version
            )));
        }
        Ok(delta)
    }

    /// Lists recorded versions in ascending order.
    ///
    /// Hidden files (leftover temporary files from an interrupted write) are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::CorruptState`] for files that are not named
    /// `<version>.bin`, or an I/O error if the directory cannot be read.
    pub fn versions(&self) -> Result<Vec<u64>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FmError::corrupt(format!("missing {}", self.dir.display())));
            }
            Err(e) => return Err(FmError::io(&self.dir, e)),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.at_path(&self.dir)?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }

            let version = name
                .strip_suffix(&format!(".{DELTA_EXT}"))
                .and_then(|stem| stem.parse::<u64>().ok())
                .ok_or_else(|| {
                    FmError::corrupt(format!(
                        "unexpected file in delta log: {}",
                        entry.path().display()
                    ))
                })?;
            versions.push(version);
        }
        versions.sort_unstable();
        Ok(versions)
    }
}
