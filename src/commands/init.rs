use crate::output;
use crate::repository::Repository;
use anyhow::{Context, Result};
use std::path::Path;

/// Initialize tracking for the directory at `path`
///
/// # Errors
///
/// Returns an error if:
/// - The directory does not exist
/// - The directory is already tracked
/// - The metadata layout cannot be written
pub fn execute(path: &Path) -> Result<()> {
    let mut repo = Repository::open(path)?;
    repo.init()
        .with_context(|| format!("Failed to initialize {}", path.display()))?;

    output::success(&format!(
        "Initialized empty fm repository in {}",
        repo.metadata_dir().display()
    ));
    Ok(())
}
