//! Utility functions and helpers.
//!
//! - [`compress`]: Zstandard helpers for persisted records
//! - [`hash`]: SHA-256 content digests
//! - [`paths`]: record-path conversion and atomic writes
//! - [`serialization`]: bincode encoding
//! - [`thread_pool`]: rayon pool configuration

/// Compression utilities (Zstandard)
pub mod compress;
/// Content hashing
pub mod hash;
/// Path manipulation and atomic file writes
pub mod paths;
/// Binary serialization utilities
pub mod serialization;
/// Thread pool configuration for parallel operations
pub mod thread_pool;

use glob::Pattern;

/// Compiled ignore patterns matched against forward-slash record paths.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    /// Compiled glob patterns
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// Compiles `patterns` into an ignore set.
    ///
    /// # Errors
    ///
    /// Returns the offending pattern and the glob error if any pattern is invalid.
    pub fn new(patterns: &[String]) -> Result<Self, (String, glob::PatternError)> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::new(p.trim_end_matches('/')).map_err(|e| (p.clone(), e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if the set has no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Determines if a record path should be ignored.
    ///
    /// A pattern matches either the whole relative path or any single
    /// component of it, so `target` excludes `target/` at any depth and
    /// `*.tmp` excludes temp files everywhere.
    #[must_use]
    pub fn should_ignore(&self, record_path: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            pattern.matches(record_path) || record_path.split('/').any(|c| pattern.matches(c))
        })
    }
}

/// Formats a file size in bytes into a human-readable string with appropriate units.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size.round() as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Returns the current timestamp as seconds since the Unix epoch.
#[must_use]
pub fn get_current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_component_and_glob() {
        let set = IgnoreSet::new(&["target/".to_string(), "*.tmp".to_string()]).unwrap();
        assert!(set.should_ignore("target"));
        assert!(set.should_ignore("crates/x/target/debug/out"));
        assert!(set.should_ignore("notes/draft.tmp"));
        assert!(!set.should_ignore("notes/draft.md"));
    }

    #[test]
    fn test_empty_set_ignores_nothing() {
        let set = IgnoreSet::default();
        assert!(set.is_empty());
        assert!(!set.should_ignore("anything/at/all"));
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let err = IgnoreSet::new(&["[".to_string()]).unwrap_err();
        assert_eq!(err.0, "[");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(10), "10 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1024 * 1024 * 3), "3.00 MB");
    }
}
