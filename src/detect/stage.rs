//! One refinement pass of the change detector.

use crate::storage::FileRecord;
use std::collections::HashMap;

/// Placeholder for an attribute a record does not know. It never equals a
/// size or a hex digest, so an unknown attribute always reads as a change.
const UNKNOWN: &str = "?";

/// The comparison key used by a refinement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Same path
    Path,
    /// Same size and path
    SizePath,
    /// Same content digest and path
    DigestPath,
}

impl Stage {
    /// Builds the comparison key of `record` for this stage.
    #[must_use]
    pub fn key(self, record: &FileRecord) -> String {
        match self {
            Self::Path => record.path.clone(),
            Self::SizePath => {
                let size = record
                    .size
                    .map_or_else(|| UNKNOWN.to_string(), |s| s.to_string());
                format!("{size}|{}", record.path)
            }
            Self::DigestPath => {
                format!(
                    "{}|{}",
                    record.digest.as_deref().unwrap_or(UNKNOWN),
                    record.path
                )
            }
        }
    }
}

/// Output of one pass.
///
/// `kept_old[i]` and `kept_new[i]` always describe the same path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Refinement {
    /// New-side records whose key has no old counterpart
    pub added: Vec<FileRecord>,
    /// Old-side records whose key has no new counterpart
    pub removed: Vec<FileRecord>,
    /// Old-side records whose key matched
    pub kept_old: Vec<FileRecord>,
    /// New-side records whose key matched
    pub kept_new: Vec<FileRecord>,
}

/// Partitions two record collections by `stage`'s key.
///
/// Both inputs must have unique paths; every key contains the path, so keys
/// are unique too. All outputs are sorted by key, which makes the result
/// independent of input order.
#[must_use]
pub fn refine(old: Vec<FileRecord>, new: Vec<FileRecord>, stage: Stage) -> Refinement {
    let mut new_by_key: HashMap<String, FileRecord> =
        new.into_iter().map(|r| (stage.key(&r), r)).collect();

    let mut old_keyed: Vec<(String, FileRecord)> =
        old.into_iter().map(|r| (stage.key(&r), r)).collect();
    old_keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut refinement = Refinement::default();
    for (key, old_record) in old_keyed {
        match new_by_key.remove(&key) {
            Some(new_record) => {
                refinement.kept_old.push(old_record);
                refinement.kept_new.push(new_record);
            }
            None => refinement.removed.push(old_record),
        }
    }

    let mut added: Vec<(String, FileRecord)> = new_by_key.into_iter().collect();
    added.sort_by(|a, b| a.0.cmp(&b.0));
    refinement.added = added.into_iter().map(|(_, r)| r).collect();

    refinement
}
