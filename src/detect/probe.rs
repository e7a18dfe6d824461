use crate::error::{IoContext, Result};
use crate::utils::hash::{DEFAULT_MMAP_THRESHOLD, hash_file};
use crate::utils::paths::from_record_path;
use std::path::PathBuf;

/// Source of the lazily computed attributes of live files.
///
/// Paths are record paths relative to the tracked root.
pub trait ContentProbe: Sync {
    /// Size of the file in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be inspected.
    fn size(&self, path: &str) -> Result<u64>;

    /// Hex digest of the file's full content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn digest(&self, path: &str) -> Result<String>;
}

/// Reads sizes and digests from the tracked directory on disk.
#[derive(Debug, Clone)]
pub struct LiveTree {
    root: PathBuf,
    mmap_threshold: u64,
}

impl LiveTree {
    /// Probes files under `root`.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            root,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }

    /// Sets the size from which files are hashed through mmap.
    #[must_use]
    pub const fn with_mmap_threshold(mut self, mmap_threshold: u64) -> Self {
        self.mmap_threshold = mmap_threshold;
        self
    }
}

impl ContentProbe for LiveTree {
    fn size(&self, path: &str) -> Result<u64> {
        let full = from_record_path(&self.root, path);
        Ok(std::fs::metadata(&full).at_path(&full)?.len())
    }

    fn digest(&self, path: &str) -> Result<String> {
        hash_file(&from_record_path(&self.root, path), self.mmap_threshold)
    }
}
