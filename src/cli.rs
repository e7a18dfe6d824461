//! Command-line interface definitions for fm.
//!
//! The CLI definitions are shared between the main binary and build tools
//! (xtask) for man page generation.
//!
//! Field-level documentation doubles as clap help text.

#![allow(clippy::missing_docs_in_private_items)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for fm.
#[derive(Parser, Debug)]
#[command(
    name = "fm",
    version = crate::VERSION,
    about = "Minimal version tracking for a directory tree",
    long_about = "Records successive snapshots of a directory tree and reports which files were \
                  added or removed between them, exporting the added files of each commit"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// All available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start tracking a directory
    Init {
        /// Directory to track
        path: PathBuf,
    },

    /// Record the directory's current state as a new version
    Commit {
        /// Directory to commit
        path: PathBuf,

        /// Compare file contents of same-size files, not just sizes
        #[arg(long)]
        verify: bool,

        /// Search parent directories for the repository
        #[arg(long)]
        discover: bool,
    },
}
