use crate::output;
use crate::repository::{CommitOutcome, Repository};
use crate::utils::{format_size, thread_pool};
use anyhow::Result;
use std::path::Path;

/// Record the current state of the tracked directory at `path`
///
/// Content verification runs when `verify` is set or when
/// `core.verify_content` is enabled in the repository's config.
///
/// # Errors
///
/// Returns an error if:
/// - The directory is not tracked (or, with `discover`, no ancestor is)
/// - Another commit holds the repository lock
/// - The stored state is corrupt
/// - Scanning, hashing, or writing fails
pub fn execute(path: &Path, verify: bool, discover: bool) -> Result<()> {
    let repo = if discover {
        Repository::discover(path)?
    } else {
        Repository::open(path)?
    };

    if let Err(e) = thread_pool::configure_from_config(repo.config()) {
        output::warning(&format!("Warning: Failed to configure thread pool: {e}"));
    }

    let verify_content = verify || repo.config().core.verify_content;
    let outcome = repo.commit(verify_content)?;

    for link in outcome.skipped_links() {
        output::warning(&format!("Warning: skipped symlink {link}"));
    }

    match outcome {
        CommitOutcome::NoChanges { version, .. } => {
            output::result("No changes detected.");
            output::verbose(&format!("Repository remains at version {version}"));
        }
        CommitOutcome::Committed { version, delta, .. } => {
            output::result(&delta.render(false));
            let added_bytes: u64 = delta.added.iter().filter_map(|r| r.size).sum();
            output::verbose(&format!(
                "Version {version}: exported {} to {}",
                format_size(added_bytes),
                repo.export_dir().display()
            ));
            output::info(&format!(
                "Details written to {}",
                repo.changes_path().display()
            ));
        }
    }

    Ok(())
}
