#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::arithmetic_side_effects)] // Version counters and size sums cannot overflow
#![allow(clippy::float_arithmetic)] // Required for file size formatting
#![allow(clippy::indexing_slicing)] // Bounds checked by logic

//! # fm - Minimal Version Tracking for a Directory Tree
//!
//! fm takes successive snapshots of a single directory, works out which
//! files were added and removed since the previous snapshot, and records
//! that delta durably under `<root>/.fm`.
//!
//! ## Features
//!
//! - **Progressive refinement**: files are compared by path, then size, and
//!   only with `--verify` by content digest, so unchanged files are never
//!   read
//! - **Parallel Processing**: sizes and SHA-256 digests are computed with Rayon
//! - **Binary State**: snapshots and deltas use bincode with Zstandard compression
//! - **Export**: the files added by each commit are hard-linked into `.fm/export`
//!
//! ## Architecture
//!
//! - [`tracking`]: Directory walking that builds live snapshots
//! - [`detect`]: The staged change detector
//! - [`storage`]: File records, snapshots, deltas, and their persistence
//! - [`repository`]: Init, state validation, and the commit pipeline
//! - [`config`]: Per-repository configuration
//! - [`commands`]: Command implementations (init, commit)
//! - [`output`]: Coloured, verbosity-aware status output
//! - [`utils`]: Hashing, compression, serialization, and path helpers
//!
//! ## Example Usage
//!
//! ```no_run
//! use fm::{CommitOutcome, Repository};
//! use std::path::Path;
//!
//! # fn main() -> fm::Result<()> {
//! let mut repo = Repository::open(Path::new("/srv/data"))?;
//! repo.init()?;
//!
//! if let CommitOutcome::Committed { delta, .. } = repo.commit(false)? {
//!     println!("{}", delta.render(false));
//! }
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Commands module containing all CLI command implementations.
pub mod commands;

/// Configuration parsing, validation, and management.
pub mod config;

/// Change detection between snapshots.
pub mod detect;

/// Error types.
pub mod error;

/// Repository locking to prevent concurrent commits.
pub mod lock;

/// Output formatting for the CLI.
pub mod output;

/// Repository orchestration: init, load, and commit.
pub mod repository;

/// Core storage layer: records, snapshots, deltas, and version state.
pub mod storage;

/// Directory walking for live snapshots.
pub mod tracking;

/// Utility functions and helpers.
pub mod utils;

pub use detect::{ChangeDetector, Changes, detect_changes};
pub use error::{FmError, Result};
pub use repository::{CommitOutcome, Repository, RepositoryState};
pub use storage::{Delta, FileRecord, Snapshot};

/// Current version of the fm binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the metadata directory inside the tracked root.
pub const METADATA_DIR: &str = ".fm";

/// Version marker file.
pub const REPO_FILE: &str = "repo.toml";

/// Current snapshot file.
pub const SNAPSHOT_FILE: &str = "snapshot.bin";

/// Directory holding one delta file per version.
pub const DELTA_DIR: &str = "delta";

/// Detailed render of the latest delta.
pub const CHANGES_FILE: &str = "changes.txt";

/// Directory holding the latest delta's added files.
pub const EXPORT_DIR: &str = "export";

/// Per-repository configuration file.
pub const CONFIG_FILE: &str = "config.toml";

/// Lock file held during a commit.
pub const LOCK_FILE: &str = "fm.lock";
