//! Building snapshots of the live directory tree.
//!
//! [`DirectoryScanner`] walks the tracked root and produces a
//! [`crate::storage::Snapshot`] holding one path-only record per regular
//! file. Sizes and digests are left for the change detector to fill in.
//!
//! # Usage
//!
//! ```no_run
//! use fm::tracking::DirectoryScanner;
//! use fm::utils::IgnoreSet;
//! use std::path::PathBuf;
//!
//! # fn main() -> fm::Result<()> {
//! let scanner = DirectoryScanner::new(PathBuf::from("/srv/data"), IgnoreSet::default(), true);
//! let report = scanner.scan()?;
//! println!("{} files", report.snapshot.len());
//! # Ok(())
//! # }
//! ```

pub mod scanner;

pub use scanner::{DirectoryScanner, ScanReport};
