use crate::error::{FmError, IoContext, Result};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Converts a path relative to the tracked root into the forward-slash form
/// stored in file records.
///
/// Returns `None` for paths outside `base` or with components that are not
/// valid UTF-8.
#[must_use]
pub fn to_record_path(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Resolves a forward-slash record path against the tracked root.
#[must_use]
pub fn from_record_path(base: &Path, record_path: &str) -> PathBuf {
    record_path
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}

/// Ensures parent directories exist for a given path
///
/// # Errors
///
/// Returns an error if the parent directories cannot be created
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).at_path(parent)?;
    }
    Ok(())
}

/// Makes a path absolute, resolving relative paths from current directory
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined
pub fn make_absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir = std::env::current_dir().at_path(path)?;
        Ok(current_dir.join(path))
    }
}

/// Writes `data` to `path` through a temporary sibling file and a rename, so
/// readers observe either the old or the new content.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created, written or
/// renamed into place.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| FmError::io(path, std::io::Error::other("path has no parent")))?;
    ensure_parent_dirs(path)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).at_path(parent)?;
    tmp.write_all(data).at_path(tmp.path())?;
    tmp.as_file().sync_all().at_path(tmp.path())?;
    tmp.persist(path).map_err(|e| FmError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_to_record_path() {
        let base = PathBuf::from("/data/tree");
        let path = base.join("docs").join("readme.md");
        assert_eq!(to_record_path(&path, &base), Some("docs/readme.md".to_string()));

        assert_eq!(to_record_path(&base, &base), None);
        assert_eq!(to_record_path(Path::new("/elsewhere/x"), &base), None);
    }

    #[test]
    fn test_record_path_round_trip() {
        let base = PathBuf::from("/data/tree");
        let resolved = from_record_path(&base, "a/b/c.txt");
        assert_eq!(resolved, base.join("a").join("b").join("c.txt"));
        assert_eq!(to_record_path(&resolved, &base).as_deref(), Some("a/b/c.txt"));
    }

    #[test]
    fn test_ensure_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_file = temp_dir.path().join("a/b/c/file.txt");

        ensure_parent_dirs(&nested_file).unwrap();
        assert!(nested_file.parent().unwrap().exists());
    }

    #[test]
    fn test_make_absolute() {
        let absolute = PathBuf::from("/absolute/path");
        assert_eq!(make_absolute(&absolute).unwrap(), absolute);

        let result = make_absolute(Path::new("relative/path")).unwrap();
        assert!(result.is_absolute());
        assert!(result.ends_with("relative/path"));
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("state/repo.toml");

        write_atomic(&target, b"version = 1\n").unwrap();
        write_atomic(&target, b"version = 2\n").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "version = 2\n");
        let leftovers = fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
