//! Change detection between two snapshots.
//!
//! Detection narrows a working set of presumably unchanged files through up
//! to three key-refinement passes:
//!
//! 1. [`Stage::Path`]: files present on one side only are added or removed.
//! 2. [`Stage::SizePath`]: sizes are filled in for the remaining pairs; a
//!    size change turns the pair into a removed old record and an added new
//!    record on the same path.
//! 3. [`Stage::DigestPath`], only with content verification: digests are
//!    computed and compared the same way, catching same-size edits.
//!
//! Without verification a same-size edit at an unchanged path is not seen.
//! That is the price of never reading file contents for unchanged files.
//!
//! Every pass is a pure function over owned record collections
//! ([`refine`]); sizes and digests come from a [`ContentProbe`].

mod probe;
mod stage;

pub use probe::{ContentProbe, LiveTree};
pub use stage::{Refinement, Stage, refine};

use crate::error::Result;
use crate::storage::{FileRecord, Snapshot};
use crate::utils::thread_pool::run_in_pool;
use rayon::prelude::*;

/// Partition produced by [`ChangeDetector::detect`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Changes {
    /// New records with no match in the old snapshot, fully described
    pub added: Vec<FileRecord>,
    /// Old records with no match in the new snapshot
    pub removed: Vec<FileRecord>,
    /// New records that matched, with sizes (and known digests) filled in
    pub kept: Vec<FileRecord>,
}

impl Changes {
    /// Whether nothing was added or removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// The new snapshot with every attribute learnt during detection.
    #[must_use]
    pub fn new_snapshot(&self) -> Snapshot {
        self.kept.iter().chain(&self.added).cloned().collect()
    }
}

/// Compares snapshots using a [`ContentProbe`] for the live side.
pub struct ChangeDetector<'a, P: ContentProbe> {
    probe: &'a P,
    verify_content: bool,
}

impl<'a, P: ContentProbe> ChangeDetector<'a, P> {
    /// Creates a detector; `verify_content` enables the digest pass.
    #[must_use]
    pub const fn new(probe: &'a P, verify_content: bool) -> Self {
        Self {
            probe,
            verify_content,
        }
    }

    /// Partitions `old` and `new` into added, removed and kept records.
    ///
    /// Old records are never probed: their stored size and digest are
    /// compared as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe cannot read a size or digest.
    pub fn detect(&self, old: Snapshot, new: Snapshot) -> Result<Changes> {
        let mut changes = Changes::default();

        let by_path = refine(old.into_records(), new.into_records(), Stage::Path);
        tracing::debug!(
            added = by_path.added.len(),
            removed = by_path.removed.len(),
            kept = by_path.kept_new.len(),
            "path stage"
        );
        changes.added.extend(by_path.added);
        changes.removed.extend(by_path.removed);

        let kept_new = self.backfill(by_path.kept_new, false)?;
        let by_size = refine(by_path.kept_old, kept_new, Stage::SizePath);
        tracing::debug!(
            added = by_size.added.len(),
            removed = by_size.removed.len(),
            kept = by_size.kept_new.len(),
            "size stage"
        );
        changes.added.extend(by_size.added);
        changes.removed.extend(by_size.removed);

        let kept = if self.verify_content {
            let kept_new = self.backfill(by_size.kept_new, true)?;
            let by_digest = refine(by_size.kept_old, kept_new, Stage::DigestPath);
            tracing::debug!(
                added = by_digest.added.len(),
                removed = by_digest.removed.len(),
                kept = by_digest.kept_new.len(),
                "digest stage"
            );
            changes.added.extend(by_digest.added);
            changes.removed.extend(by_digest.removed);
            by_digest.kept_new
        } else {
            inherit_digests(by_size.kept_old, by_size.kept_new)
        };

        changes.added = self.backfill(changes.added, true)?;
        changes.added.sort_by(|a, b| a.path.cmp(&b.path));
        changes.removed.sort_by(|a, b| a.path.cmp(&b.path));
        changes.kept = kept;
        Ok(changes)
    }

    /// Fills in missing sizes, and missing digests when `with_digest` is set.
    fn backfill(&self, records: Vec<FileRecord>, with_digest: bool) -> Result<Vec<FileRecord>> {
        run_in_pool(|| {
            records
                .into_par_iter()
                .map(|mut record| {
                    if record.size.is_none() {
                        record.size = Some(self.probe.size(&record.path)?);
                    }
                    if with_digest && record.digest.is_none() {
                        record.digest = Some(self.probe.digest(&record.path)?);
                    }
                    Ok(record)
                })
                .collect()
        })
    }
}

/// Carries each kept old record's digest over to its new counterpart when
/// the new record has none, so the digest taken when a file was added keeps
/// travelling with it through unverified commits.
fn inherit_digests(kept_old: Vec<FileRecord>, kept_new: Vec<FileRecord>) -> Vec<FileRecord> {
    kept_old
        .into_iter()
        .zip(kept_new)
        .map(|(old, mut new)| {
            if new.digest.is_none() {
                new.digest = old.digest;
            }
            new
        })
        .collect()
}

/// Runs a [`ChangeDetector`] over `old` and `new`.
///
/// # Errors
///
/// Returns an error if the probe cannot read a size or digest.
pub fn detect_changes<P: ContentProbe>(
    old: Snapshot,
    new: Snapshot,
    probe: &P,
    verify_content: bool,
) -> Result<Changes> {
    ChangeDetector::new(probe, verify_content).detect(old, new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FmError;
    use crate::utils::hash::hash_bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory tree that counts digest reads.
    #[derive(Default)]
    struct MemoryTree {
        files: HashMap<String, Vec<u8>>,
        digests_read: AtomicUsize,
    }

    impl MemoryTree {
        fn with(files: &[(&str, &[u8])]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(p, c)| ((*p).to_string(), c.to_vec()))
                    .collect(),
                digests_read: AtomicUsize::new(0),
            }
        }

        fn snapshot(&self) -> Snapshot {
            self.files.keys().map(FileRecord::new).collect()
        }

        fn described(&self, path: &str) -> FileRecord {
            let content = &self.files[path];
            FileRecord::described(path, content.len() as u64, hash_bytes(content))
        }
    }

    impl ContentProbe for MemoryTree {
        fn size(&self, path: &str) -> Result<u64> {
            self.files
                .get(path)
                .map(|c| c.len() as u64)
                .ok_or_else(|| FmError::io(path, std::io::ErrorKind::NotFound.into()))
        }

        fn digest(&self, path: &str) -> Result<String> {
            self.digests_read.fetch_add(1, Ordering::SeqCst);
            self.files
                .get(path)
                .map(|c| hash_bytes(c))
                .ok_or_else(|| FmError::io(path, std::io::ErrorKind::NotFound.into()))
        }
    }

    fn paths(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn test_first_commit_adds_everything_described() {
        let tree = MemoryTree::with(&[("a.txt", b"0123456789"), ("d/b.txt", b"")]);
        let changes = detect_changes(Snapshot::new(), tree.snapshot(), &tree, false).unwrap();

        assert_eq!(paths(&changes.added), vec!["a.txt", "d/b.txt"]);
        assert!(changes.removed.is_empty());
        assert!(changes.added.iter().all(FileRecord::is_described));
        assert_eq!(changes.added[0], tree.described("a.txt"));
    }

    #[test]
    fn test_identical_snapshots_yield_nothing() {
        let tree = MemoryTree::with(&[("a", b"x"), ("b", b"yy")]);
        let old: Snapshot = ["a", "b"].iter().map(|p| tree.described(p)).collect();

        for verify in [false, true] {
            let changes = detect_changes(old.clone(), tree.snapshot(), &tree, verify).unwrap();
            assert!(changes.is_empty());
            assert_eq!(changes.kept.len(), 2);
        }
    }

    #[test]
    fn test_unverified_commit_reads_no_content_for_kept_files() {
        let tree = MemoryTree::with(&[("a", b"x"), ("b", b"yy")]);
        let old: Snapshot = ["a", "b"].iter().map(|p| tree.described(p)).collect();

        let changes = detect_changes(old, tree.snapshot(), &tree, false).unwrap();
        assert!(changes.is_empty());
        assert_eq!(tree.digests_read.load(Ordering::SeqCst), 0);
        assert!(changes.kept.iter().all(FileRecord::is_described));
    }

    #[test]
    fn test_size_change_reported_as_remove_and_add() {
        let tree = MemoryTree::with(&[("a.txt", b"twelve bytes")]);
        let old: Snapshot = std::iter::once(FileRecord::described("a.txt", 10, "0".repeat(64)))
            .collect();

        for verify in [false, true] {
            let changes = detect_changes(old.clone(), tree.snapshot(), &tree, verify).unwrap();
            assert_eq!(changes.removed, vec![FileRecord::described("a.txt", 10, "0".repeat(64))]);
            assert_eq!(changes.added, vec![tree.described("a.txt")]);
        }
    }

    #[test]
    fn test_same_size_edit_needs_verification() {
        let tree = MemoryTree::with(&[("a.txt", b"AAAA")]);
        let stale = FileRecord::described("a.txt", 4, hash_bytes(b"BBBB"));
        let old: Snapshot = std::iter::once(stale.clone()).collect();

        let unverified = detect_changes(old.clone(), tree.snapshot(), &tree, false).unwrap();
        assert!(unverified.is_empty());
        assert_eq!(unverified.kept[0].digest, stale.digest);

        let verified = detect_changes(old, tree.snapshot(), &tree, true).unwrap();
        assert_eq!(verified.removed, vec![stale]);
        assert_eq!(verified.added, vec![tree.described("a.txt")]);
        assert!(verified.kept.is_empty());
    }

    #[test]
    fn test_old_record_without_digest_is_conservatively_changed() {
        let tree = MemoryTree::with(&[("a", b"same")]);
        let old: Snapshot = std::iter::once(FileRecord {
            path: "a".to_string(),
            size: Some(4),
            digest: None,
        })
        .collect();

        let changes = detect_changes(old, tree.snapshot(), &tree, true).unwrap();
        assert_eq!(paths(&changes.removed), vec!["a"]);
        assert_eq!(paths(&changes.added), vec!["a"]);
    }

    #[test]
    fn test_new_snapshot_combines_kept_and_added() {
        let tree = MemoryTree::with(&[("keep", b"k"), ("new", b"n")]);
        let old: Snapshot = [tree.described("keep"), FileRecord::described("gone", 1, "d")]
            .into_iter()
            .collect();

        let changes = detect_changes(old, tree.snapshot(), &tree, false).unwrap();
        let snapshot = changes.new_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.records().all(FileRecord::is_described));
        assert_eq!(paths(&changes.removed), vec!["gone"]);
    }

    #[test]
    fn test_probe_failure_propagates() {
        let tree = MemoryTree::with(&[]);
        let live: Snapshot = std::iter::once(FileRecord::new("vanished")).collect();
        let result = detect_changes(Snapshot::new(), live, &tree, false);
        assert!(matches!(result, Err(FmError::IoFailure { .. })));
    }
}
