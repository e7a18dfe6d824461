//! Error types shared by the storage, tracking and repository layers.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, FmError>;

/// Errors that can occur while tracking a directory.
///
/// Every variant is terminal for the current invocation; nothing is retried
/// internally.
#[derive(Debug, Error)]
pub enum FmError {
    /// The target directory does not exist or is not a directory.
    #[error("'{}' not found.", .0.display())]
    PathNotFound(PathBuf),

    /// `init` was run on a directory that already has metadata.
    #[error("Repository already exists at '{}'.", .0.display())]
    AlreadyInitialized(PathBuf),

    /// A command that needs a repository was run outside of one.
    #[error("'{}' is not a repository.", .0.display())]
    NotARepository(PathBuf),

    /// Metadata exists but is unreadable, malformed or inconsistent.
    #[error("Repository state is corrupt: {0}")]
    CorruptState(String),

    /// A read, write or link failed while scanning, hashing or exporting.
    #[error("I/O error on '{}': {source}", .path.display())]
    IoFailure {
        /// Path the failing operation was applied to
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the repository lock.
    #[error("Another commit is already running on this repository (lock: {}).", .0.display())]
    Locked(PathBuf),

    /// The configuration file could not be parsed or holds invalid values.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl FmError {
    /// Wraps an I/O error together with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::IoFailure {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a corrupt-state error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptState(message.into())
    }
}

/// Attaches a path to `std::io::Result`s, turning them into [`FmError::IoFailure`].
pub trait IoContext<T> {
    /// Maps the error side to [`FmError::IoFailure`] for `path`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error when `self` is `Err`.
    fn at_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| FmError::io(path, e))
    }
}
