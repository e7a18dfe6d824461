/// Per-version change records and their export
pub mod delta;
/// Current-snapshot persistence
pub mod snapshot;
/// Version marker (`repo.toml`)
pub mod state;

pub use delta::{Delta, DeltaLog};
pub use snapshot::{Snapshot, SnapshotManager};
pub use state::RepoState;

use crate::error::{FmError, Result};
use crate::utils::{compress, paths::write_atomic, serialization};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One tracked file.
///
/// Only `path` is known when a record is created by a directory walk; `size`
/// and `digest` are filled in by the change detector when a stage needs them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the tracked root, `/`-separated
    pub path: String,
    /// Size in bytes, if known
    pub size: Option<u64>,
    /// SHA-256 hex digest of the content, if known
    pub digest: Option<String>,
}

impl FileRecord {
    /// Creates a record with only its path known.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: None,
            digest: None,
        }
    }

    /// Creates a record with every attribute known.
    #[must_use]
    pub fn described(path: impl Into<String>, size: u64, digest: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: Some(size),
            digest: Some(digest.into()),
        }
    }

    /// Whether both size and digest are populated.
    #[must_use]
    pub const fn is_described(&self) -> bool {
        self.size.is_some() && self.digest.is_some()
    }
}

impl fmt::Display for FileRecord {
    /// `path | size | digest`, with `-` for unknown attributes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size.map_or_else(|| "-".to_string(), |s| s.to_string());
        write!(
            f,
            "{} | {} | {}",
            self.path,
            size,
            self.digest.as_deref().unwrap_or("-")
        )
    }
}

/// A record encoded and compressed in memory, not yet on disk.
#[derive(Debug)]
#[must_use = "an encoded record does nothing until it is written"]
pub struct EncodedRecord {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl EncodedRecord {
    /// Writes the record atomically.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::IoFailure`] if the write fails.
    pub fn write(self) -> Result<()> {
        write_atomic(&self.path, &self.bytes)
    }
}

/// Encodes `value` with bincode and compresses it.
fn encode_record<T: Serialize>(path: &Path, value: &T, level: i32) -> Result<EncodedRecord> {
    let serialized = serialization::serialize(value)
        .map_err(|e| FmError::corrupt(format!("failed to encode {}: {e}", path.display())))?;
    let bytes =
        compress::compress_bytes(&serialized, level).map_err(|e| FmError::io(path, e))?;
    Ok(EncodedRecord {
        path: path.to_path_buf(),
        bytes,
    })
}

/// Encodes `value`, compresses it and writes it atomically.
#[cfg(test)]
fn write_record<T: Serialize>(path: &Path, value: &T, level: i32) -> Result<()> {
    encode_record(path, value, level)?.write()
}

/// Reads a record written from [`encode_record`].
///
/// A missing, truncated or undecodable file is corrupt state: records are
/// only read from an initialized repository where they must exist.
fn read_record<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let compressed = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FmError::corrupt(format!("missing {}", path.display())));
        }
        Err(e) => return Err(FmError::io(path, e)),
    };
    let decompressed = compress::decompress_bytes(&compressed)
        .map_err(|e| FmError::corrupt(format!("unreadable {}: {e}", path.display())))?;
    serialization::deserialize(&decompressed)
        .map_err(|e| FmError::corrupt(format!("malformed {}: {e}", path.display())))
}
