//! Repository locking to prevent concurrent commits on the same tracked root
//!
//! A commit rewrites several metadata files in sequence. Holding an exclusive
//! lock on `.fm/fm.lock` for the whole commit keeps two `fm` processes from
//! interleaving those writes. The lock is released when dropped; the file
//! itself stays in place so every process locks the same inode.

use crate::LOCK_FILE;
use crate::error::{FmError, IoContext, Result};
use fs4::fs_std::FileExt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Holds an exclusive lock on a repository's metadata directory
///
/// The lock is automatically released when this struct is dropped.
#[derive(Debug)]
pub struct RepositoryLock {
    /// Lock file handle
    lock_file: File,
    /// Path to the lock file
    lock_path: PathBuf,
}

impl RepositoryLock {
    /// Acquire the lock for the repository whose metadata lives in `metadata_dir`
    ///
    /// Acquisition is attempted once; a held lock is reported immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The lock file cannot be created
    /// - Another process already holds the lock ([`FmError::Locked`])
    pub fn acquire(metadata_dir: &Path) -> Result<Self> {
        let lock_path = metadata_dir.join(LOCK_FILE);
        let mut lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .at_path(&lock_path)?;

        match lock_file.try_lock_exclusive() {
            Ok(true) => {}
            Ok(false) => return Err(FmError::Locked(lock_path)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(FmError::Locked(lock_path));
            }
            Err(e) => return Err(FmError::io(&lock_path, e)),
        }

        // Owner info is only a debugging aid
        lock_file.set_len(0).at_path(&lock_path)?;
        let _ = writeln!(
            lock_file,
            "pid={}\ntime={}",
            std::process::id(),
            humantime::format_rfc3339(SystemTime::now())
        );

        tracing::debug!(path = %lock_path.display(), "acquired repository lock");
        Ok(Self {
            lock_file,
            lock_path,
        })
    }

    /// Path of the lock file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for RepositoryLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.lock_file) {
            tracing::warn!(
                path = %self.lock_path.display(),
                error = %e,
                "failed to release repository lock"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let temp = TempDir::new().unwrap();
        let lock = RepositoryLock::acquire(temp.path()).unwrap();
        let path = lock.path().to_path_buf();
        assert!(path.exists());
        assert!(fs::read_to_string(&path).unwrap().contains("pid="));

        drop(lock);
        assert!(path.exists());
    }

    #[test]
    fn test_concurrent_locks_fail() {
        let temp = TempDir::new().unwrap();
        let _lock1 = RepositoryLock::acquire(temp.path()).unwrap();

        let result = RepositoryLock::acquire(temp.path());
        assert!(matches!(result, Err(FmError::Locked(_))));
    }

    #[test]
    fn test_reacquire_after_release() {
        let temp = TempDir::new().unwrap();
        drop(RepositoryLock::acquire(temp.path()).unwrap());
        assert!(RepositoryLock::acquire(temp.path()).is_ok());
    }

    #[test]
    fn test_handle_opened_before_release_excludes_new_holders() {
        let temp = TempDir::new().unwrap();
        let lock = RepositoryLock::acquire(temp.path()).unwrap();
        let waiting = File::open(lock.path()).unwrap();

        drop(lock);
        assert!(waiting.try_lock_exclusive().unwrap());

        let result = RepositoryLock::acquire(temp.path());
        assert!(matches!(result, Err(FmError::Locked(_))));

        FileExt::unlock(&waiting).unwrap();
        assert!(RepositoryLock::acquire(temp.path()).is_ok());
    }

    #[test]
    fn test_missing_metadata_dir() {
        let temp = TempDir::new().unwrap();
        let result = RepositoryLock::acquire(&temp.path().join("absent"));
        assert!(matches!(result, Err(FmError::IoFailure { .. })));
    }
}
