use crate::error::{FmError, Result};
use crate::utils::paths::write_atomic;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The version marker persisted in `repo.toml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoState {
    /// Number of non-empty deltas committed so far
    pub version: u64,
}

impl RepoState {
    /// Load the marker
    ///
    /// # Errors
    ///
    /// Returns [`FmError::CorruptState`] if the file is missing or malformed,
    /// and [`FmError::IoFailure`] for other read errors.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FmError::corrupt(format!("missing {}", path.display())));
            }
            Err(e) => return Err(FmError::io(path, e)),
        };
        toml::from_str(&content)
            .map_err(|e| FmError::corrupt(format!("malformed {}: {e}", path.display())))
    }

    /// Save the marker atomically
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string(self)
            .map_err(|e| FmError::corrupt(format!("failed to encode state: {e}")))?;
        write_atomic(path, content.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_state_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repo.toml");

        RepoState { version: 7 }.save(&path).unwrap();
        assert_eq!(RepoState::load(&path).unwrap().version, 7);
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "version = 7");
    }

    #[test]
    fn test_garbled_state_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repo.toml");
        std::fs::write(&path, "version = \"seven\"").unwrap();

        assert!(matches!(RepoState::load(&path), Err(FmError::CorruptState(_))));
    }

    #[test]
    fn test_negative_version_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repo.toml");
        std::fs::write(&path, "version = -1").unwrap();

        assert!(matches!(RepoState::load(&path), Err(FmError::CorruptState(_))));
    }
}
