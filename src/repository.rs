//! A tracked root and its `.fm` metadata.
//!
//! [`Repository`] ties the pieces together: it creates the metadata layout,
//! validates persisted state, and runs a commit from scan to export while
//! holding the repository lock.

use crate::config::Config;
use crate::detect::{Changes, LiveTree, detect_changes};
use crate::error::{FmError, IoContext, Result};
use crate::lock::RepositoryLock;
use crate::storage::{Delta, DeltaLog, RepoState, Snapshot, SnapshotManager};
use crate::tracking::DirectoryScanner;
use crate::utils::get_current_timestamp;
use crate::utils::paths::{make_absolute, write_atomic};
use crate::{CHANGES_FILE, CONFIG_FILE, DELTA_DIR, EXPORT_DIR, METADATA_DIR, REPO_FILE, SNAPSHOT_FILE};
use std::fs;
use std::path::{Path, PathBuf};

/// Validated persisted state of an initialized repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryState {
    /// Number of non-empty commits so far
    pub version: u64,
    /// Snapshot recorded by the latest commit
    pub snapshot: Snapshot,
}

/// Result of [`Repository::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The live tree matched the stored snapshot; nothing was written.
    NoChanges {
        /// Unchanged current version
        version: u64,
        /// Symlinks skipped during the scan
        skipped_links: Vec<String>,
    },
    /// A new version was recorded.
    Committed {
        /// The new version
        version: u64,
        /// What changed
        delta: Delta,
        /// Symlinks skipped during the scan
        skipped_links: Vec<String>,
    },
}

impl CommitOutcome {
    /// Version after the commit.
    #[must_use]
    pub const fn version(&self) -> u64 {
        match self {
            Self::NoChanges { version, .. } | Self::Committed { version, .. } => *version,
        }
    }

    /// Symlinks that were not followed during the scan.
    #[must_use]
    pub fn skipped_links(&self) -> &[String] {
        match self {
            Self::NoChanges { skipped_links, .. } | Self::Committed { skipped_links, .. } => {
                skipped_links
            }
        }
    }
}

/// A directory tracked by `fm`.
#[derive(Debug, Clone)]
pub struct Repository {
    /// Absolute path of the tracked root
    root: PathBuf,
    /// `<root>/.fm`
    metadata: PathBuf,
    /// Configuration from `.fm/config.toml`, or defaults
    config: Config,
}

impl Repository {
    /// Opens the directory at `path`, initialized or not.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::PathNotFound`] if `path` is not an existing
    /// directory, or [`FmError::Config`] if its configuration is invalid.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(FmError::PathNotFound(path.to_path_buf()));
        }
        let root = make_absolute(path)?;
        let metadata = root.join(METADATA_DIR);
        let config = Config::load(&metadata.join(CONFIG_FILE))?;
        Ok(Self {
            root,
            metadata,
            config,
        })
    }

    /// Opens the nearest initialized repository at or above `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::PathNotFound`] if `path` is not a directory and
    /// [`FmError::NotARepository`] if no ancestor holds metadata.
    pub fn discover(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(FmError::PathNotFound(path.to_path_buf()));
        }
        let start = make_absolute(path)?;
        let root = start
            .ancestors()
            .find(|dir| dir.join(METADATA_DIR).is_dir())
            .ok_or_else(|| FmError::NotARepository(path.to_path_buf()))?;
        tracing::debug!(root = %root.display(), "discovered repository");
        Self::open(root)
    }

    /// Tracked root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.fm` directory
    #[must_use]
    pub fn metadata_dir(&self) -> &Path {
        &self.metadata
    }

    /// Loaded configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Where the detailed render of the latest delta is written
    #[must_use]
    pub fn changes_path(&self) -> PathBuf {
        self.metadata.join(CHANGES_FILE)
    }

    /// Where the latest delta's added files are exported
    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.metadata.join(EXPORT_DIR)
    }

    /// Whether the metadata directory exists
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.metadata.is_dir()
    }

    /// Store for `snapshot.bin`
    fn snapshot_manager(&self) -> SnapshotManager {
        SnapshotManager::new(
            self.metadata.join(SNAPSHOT_FILE),
            self.config.core.compression_level,
        )
    }

    /// Store for `delta/<N>.bin`
    fn delta_log(&self) -> DeltaLog {
        DeltaLog::new(
            self.metadata.join(DELTA_DIR),
            self.config.core.compression_level,
        )
    }

    fn check_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(FmError::NotARepository(self.root.clone()))
        }
    }

    /// Creates the metadata layout at version 0 with an empty snapshot and
    /// the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::AlreadyInitialized`] if metadata already exists,
    /// or an I/O error if any file cannot be written.
    pub fn init(&mut self) -> Result<()> {
        if self.metadata.exists() {
            return Err(FmError::AlreadyInitialized(self.root.clone()));
        }

        fs::create_dir_all(self.metadata.join(DELTA_DIR)).at_path(&self.metadata)?;

        self.config = Config::default();
        self.config.save(&self.metadata.join(CONFIG_FILE))?;
        self.snapshot_manager().save(0, &Snapshot::new())?;
        RepoState { version: 0 }.save(&self.metadata.join(REPO_FILE))?;

        tracing::info!(root = %self.root.display(), "initialized repository");
        Ok(())
    }

    /// Loads and cross-checks the persisted state.
    ///
    /// `repo.toml`, the version stamped in `snapshot.bin` and the delta log
    /// must agree: for version N the log holds exactly deltas `1..=N`, and
    /// delta N decodes and names itself N.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::NotARepository`] if uninitialized and
    /// [`FmError::CorruptState`] on any missing, undecodable or inconsistent
    /// file.
    pub fn load(&self) -> Result<RepositoryState> {
        self.check_initialized()?;

        let state = RepoState::load(&self.metadata.join(REPO_FILE))?;
        let (snapshot_version, snapshot) = self.snapshot_manager().load()?;
        if snapshot_version != state.version {
            return Err(FmError::corrupt(format!(
                "{REPO_FILE} is at version {} but {SNAPSHOT_FILE} is at version {snapshot_version}",
                state.version
            )));
        }

        let delta_log = self.delta_log();
        let versions = delta_log.versions()?;
        let expected: Vec<u64> = (1..=state.version).collect();
        if versions != expected {
            return Err(FmError::corrupt(format!(
                "delta log holds versions {versions:?}, expected 1..={}",
                state.version
            )));
        }
        if state.version > 0 {
            delta_log.load(state.version)?;
        }

        Ok(RepositoryState {
            version: state.version,
            snapshot,
        })
    }

    /// Records the live tree as a new version if it differs from the stored
    /// snapshot.
    ///
    /// Writes happen in a fixed order: delta, snapshot, `repo.toml`,
    /// `changes.txt`, export. Nothing is written when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::NotARepository`] if uninitialized,
    /// [`FmError::Locked`] if another commit is running,
    /// [`FmError::CorruptState`] if persisted state fails validation, and
    /// [`FmError::IoFailure`] if scanning, hashing or writing fails.
    pub fn commit(&self, verify_content: bool) -> Result<CommitOutcome> {
        self.check_initialized()?;
        let _lock = RepositoryLock::acquire(&self.metadata)?;

        let state = self.load()?;
        let report = DirectoryScanner::from_config(self.root.clone(), &self.config)?.scan()?;
        let probe = LiveTree::new(self.root.clone())
            .with_mmap_threshold(self.config.performance.mmap_threshold);

        let changes = detect_changes(state.snapshot, report.snapshot, &probe, verify_content)?;
        if changes.is_empty() {
            tracing::info!(version = state.version, "no changes detected");
            return Ok(CommitOutcome::NoChanges {
                version: state.version,
                skipped_links: report.skipped_links,
            });
        }

        let version = state.version + 1;
        let delta = self.persist(version, &changes)?;

        tracing::info!(
            version,
            added = delta.added.len(),
            removed = delta.removed.len(),
            verify_content,
            "committed"
        );
        Ok(CommitOutcome::Committed {
            version,
            delta,
            skipped_links: report.skipped_links,
        })
    }

    /// Writes the delta, snapshot, version marker, change log and export
    fn persist(&self, version: u64, changes: &Changes) -> Result<Delta> {
        let delta = Delta::new(
            version,
            get_current_timestamp(),
            changes.added.clone(),
            changes.removed.clone(),
        );

        // Nothing is written unless both records encode
        let delta_record = self.delta_log().encode(&delta)?;
        let snapshot_record = self
            .snapshot_manager()
            .encode(version, &changes.new_snapshot())?;
        delta_record.write()?;
        snapshot_record.write()?;
        RepoState { version }.save(&self.metadata.join(REPO_FILE))?;

        let mut rendered = delta.render(true);
        rendered.push('\n');
        write_atomic(&self.changes_path(), rendered.as_bytes())?;

        delta.export(
            &self.export_dir(),
            &self.root,
            self.config.performance.use_hard_links,
        )?;
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repository) {
        let temp = TempDir::new().unwrap();
        let mut repo = Repository::open(temp.path()).unwrap();
        repo.init().unwrap();
        (temp, repo)
    }

    #[test]
    fn test_open_missing_path() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        assert!(matches!(
            Repository::open(&missing),
            Err(FmError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_open_file_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(matches!(Repository::open(&file), Err(FmError::PathNotFound(_))));
    }

    #[test]
    fn test_init_layout() {
        let (_temp, repo) = init_repo();
        let meta = repo.metadata_dir();
        assert!(meta.join(REPO_FILE).is_file());
        assert!(meta.join(SNAPSHOT_FILE).is_file());
        assert!(meta.join(CONFIG_FILE).is_file());
        assert!(meta.join(DELTA_DIR).is_dir());

        let state = repo.load().unwrap();
        assert_eq!(state.version, 0);
        assert!(state.snapshot.is_empty());
    }

    #[test]
    fn test_init_twice_fails() {
        let (temp, _repo) = init_repo();
        let mut again = Repository::open(temp.path()).unwrap();
        assert!(matches!(again.init(), Err(FmError::AlreadyInitialized(_))));
    }

    #[test]
    fn test_commit_uninitialized() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::open(temp.path()).unwrap();
        assert!(matches!(repo.commit(false), Err(FmError::NotARepository(_))));
        assert!(matches!(repo.load(), Err(FmError::NotARepository(_))));
    }

    #[test]
    fn test_commit_writes_changes_and_export() {
        let (temp, repo) = init_repo();
        fs::write(temp.path().join("a.txt"), "0123456789").unwrap();

        let outcome = repo.commit(false).unwrap();
        assert_eq!(outcome.version(), 1);

        let changes = fs::read_to_string(repo.changes_path()).unwrap();
        assert!(changes.starts_with("1 files added:\na.txt | 10 | "));
        assert_eq!(
            fs::read(repo.export_dir().join("a.txt")).unwrap(),
            b"0123456789"
        );
        assert!(RepositoryLock::acquire(repo.metadata_dir()).is_ok());
    }

    #[test]
    fn test_no_change_commit_writes_nothing() {
        let (temp, repo) = init_repo();
        fs::write(temp.path().join("a.txt"), "x").unwrap();
        repo.commit(false).unwrap();
        let snapshot_before = fs::read(repo.metadata_dir().join(SNAPSHOT_FILE)).unwrap();

        let outcome = repo.commit(true).unwrap();
        assert!(matches!(outcome, CommitOutcome::NoChanges { version: 1, .. }));
        assert_eq!(
            fs::read(repo.metadata_dir().join(SNAPSHOT_FILE)).unwrap(),
            snapshot_before
        );
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let (temp, _repo) = init_repo();
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let found = Repository::discover(&nested).unwrap();
        assert_eq!(found.root(), make_absolute(temp.path()).unwrap());
    }

    #[test]
    fn test_discover_without_repository() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Repository::discover(temp.path()),
            Err(FmError::NotARepository(_))
        ));
    }

    #[test]
    fn test_commit_while_locked() {
        let (temp, repo) = init_repo();
        fs::write(temp.path().join("a.txt"), "x").unwrap();

        let _held = RepositoryLock::acquire(repo.metadata_dir()).unwrap();
        assert!(matches!(repo.commit(false), Err(FmError::Locked(_))));
    }
}
