//! Command implementations behind the CLI subcommands.

/// `fm commit`
pub mod commit;
/// `fm init`
pub mod init;

use crate::cli::Commands;
use anyhow::Result;

/// Runs the parsed subcommand.
///
/// # Errors
///
/// Returns the subcommand's error.
pub fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Init { path } => init::execute(&path),
        Commands::Commit {
            path,
            verify,
            discover,
        } => commit::execute(&path, verify, discover),
    }
}
