#![allow(dead_code)]

use anyhow::Result;
use fm::Repository;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Tracked directory fixture with an initialized repository
pub struct TestTree {
    pub temp_dir: TempDir,
    pub repo: Repository,
}

impl TestTree {
    /// Create a temporary directory and initialize fm in it
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let mut repo = Repository::open(temp_dir.path())?;
        repo.init()?;
        Ok(Self { temp_dir, repo })
    }

    /// Get the tracked root
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of a file inside `.fm`
    pub fn meta(&self, name: &str) -> PathBuf {
        self.repo.metadata_dir().join(name)
    }

    /// Write `content` to `relative`, creating parent directories
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> Result<()> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Remove a file from the tracked root
    pub fn remove(&self, relative: &str) -> Result<()> {
        fs::remove_file(self.path().join(relative))?;
        Ok(())
    }

    /// Reopen the repository, picking up config changes
    pub fn reopen(&mut self) -> Result<()> {
        self.repo = Repository::open(self.temp_dir.path())?;
        Ok(())
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new().expect("Failed to create test tree")
    }
}

/// Paths of a record list, in order
pub fn paths(records: &[fm::FileRecord]) -> Vec<&str> {
    records.iter().map(|r| r.path.as_str()).collect()
}
