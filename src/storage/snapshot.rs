use super::{EncodedRecord, FileRecord, encode_record, read_record};
use crate::error::Result;
use crate::tracking::DirectoryScanner;
use crate::utils::IgnoreSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// All files under the tracked root at one point in time.
///
/// Records are keyed by path, so a snapshot never holds two records for the
/// same path. Iteration order is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: HashMap<String, FileRecord>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks `root` and records every regular file, skipping the metadata
    /// directory and following symlinks.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FmError::IoFailure`] if any entry cannot be read.
    pub fn populate(root: &Path) -> Result<Self> {
        let scanner = DirectoryScanner::new(root.to_path_buf(), IgnoreSet::default(), true);
        Ok(scanner.scan()?.snapshot)
    }

    /// Adds a record, replacing any record with the same path.
    ///
    /// Returns the replaced record.
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.files.insert(record.path.clone(), record)
    }

    /// Looks up a record by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the snapshot has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterates records in unspecified order.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    /// Consumes the snapshot, returning its records sorted by path.
    #[must_use]
    pub fn into_records(self) -> Vec<FileRecord> {
        let mut records: Vec<FileRecord> = self.files.into_values().collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }
}

impl FromIterator<FileRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

/// On-disk form of the current snapshot, stamped with the version it
/// belongs to so a half-finished commit can be detected.
#[derive(Debug, Deserialize)]
struct SnapshotFile {
    version: u64,
    files: Vec<FileRecord>,
}

/// Borrowed counterpart of [`SnapshotFile`] used for encoding.
#[derive(Serialize)]
struct SnapshotFileRef<'a> {
    version: u64,
    files: Vec<&'a FileRecord>,
}

/// Reads and writes the current snapshot (`snapshot.bin`).
pub struct SnapshotManager {
    path: PathBuf,
    compression_level: i32,
}

impl SnapshotManager {
    /// Creates a manager for the snapshot file at `path`.
    #[must_use]
    pub const fn new(path: PathBuf, compression_level: i32) -> Self {
        Self {
            path,
            compression_level,
        }
    }

    /// Encodes `snapshot` as the state of `version` without writing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be encoded.
    pub fn encode(&self, version: u64, snapshot: &Snapshot) -> Result<EncodedRecord> {
        let mut files: Vec<&FileRecord> = snapshot.records().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        encode_record(
            &self.path,
            &SnapshotFileRef { version, files },
            self.compression_level,
        )
    }

    /// Persists `snapshot` as the state of `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be encoded or written.
    pub fn save(&self, version: u64, snapshot: &Snapshot) -> Result<()> {
        self.encode(version, snapshot)?.write()
    }

    /// Loads the persisted snapshot and the version it was stamped with.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FmError::CorruptState`] if the file is missing,
    /// undecodable or lists a path twice.
    pub fn load(&self) -> Result<(u64, Snapshot)> {
        let file: SnapshotFile = read_record(&self.path)?;
        let count = file.files.len();
        let snapshot: Snapshot = file.files.into_iter().collect();
        if snapshot.len() != count {
            return Err(crate::FmError::corrupt(format!(
                "{} lists {} duplicate paths",
                self.path.display(),
                count - snapshot.len()
            )));
        }
        Ok((file.version, snapshot))
    }
}
