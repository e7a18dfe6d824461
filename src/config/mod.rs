//! Per-repository configuration stored in `.fm/config.toml`.

use crate::error::{FmError, IoContext, Result};
use crate::utils::IgnoreSet;
use crate::utils::hash::DEFAULT_MMAP_THRESHOLD;
use crate::utils::paths::write_atomic;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Repository configuration.
///
/// Every field has a default, so a partial or missing file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Storage and commit behaviour
    #[serde(default)]
    pub core: CoreConfig,

    /// Directory walk options
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Parallelism and I/O tuning
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Storage and commit behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoreConfig {
    /// zstd level used for snapshot and delta records (1..=22)
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    /// Whether `commit` compares content digests when no flag overrides it
    #[serde(default)]
    pub verify_content: bool,
}

/// Directory walk options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Glob patterns excluded from snapshots
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Whether symlinks are followed and recorded as the files they point to
    #[serde(default = "default_follow_symlinks")]
    pub follow_symlinks: bool,
}

/// Parallelism and I/O tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerformanceConfig {
    /// Worker threads for size/digest backfill (0 = rayon default)
    #[serde(default)]
    pub parallel_threads: usize,
    /// Files at least this many bytes are hashed via mmap
    #[serde(default = "default_mmap_threshold")]
    pub mmap_threshold: u64,
    /// Export added files with hard links instead of copies
    #[serde(default = "default_use_hard_links")]
    pub use_hard_links: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            verify_content: false,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            follow_symlinks: default_follow_symlinks(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_threads: 0,
            mmap_threshold: default_mmap_threshold(),
            use_hard_links: default_use_hard_links(),
        }
    }
}

impl Config {
    /// Load configuration from a file, falling back to defaults when it is missing
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML
    /// - A value is out of range
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).at_path(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| FmError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if TOML serialization fails or the file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).map_err(|e| FmError::Config(e.to_string()))?;
        write_atomic(path, toml_str.as_bytes())
    }

    /// Check value ranges and compile ignore patterns
    ///
    /// # Errors
    ///
    /// Returns [`FmError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !(1..=22).contains(&self.core.compression_level) {
            return Err(FmError::Config(format!(
                "core.compression_level must be between 1 and 22, got {}",
                self.core.compression_level
            )));
        }
        if self.performance.mmap_threshold == 0 {
            return Err(FmError::Config(
                "performance.mmap_threshold must be greater than 0".to_string(),
            ));
        }
        self.ignore_set()?;
        Ok(())
    }

    /// Compiled form of `tracking.ignore_patterns`
    ///
    /// # Errors
    ///
    /// Returns [`FmError::Config`] naming the first invalid pattern.
    pub fn ignore_set(&self) -> Result<IgnoreSet> {
        IgnoreSet::new(&self.tracking.ignore_patterns).map_err(|(pattern, e)| {
            FmError::Config(format!("invalid ignore pattern '{pattern}': {e}"))
        })
    }
}

// Default functions for serde
const fn default_compression_level() -> i32 {
    3
}

const fn default_follow_symlinks() -> bool {
    true
}

const fn default_mmap_threshold() -> u64 {
    DEFAULT_MMAP_THRESHOLD
}

const fn default_use_hard_links() -> bool {
    true
}
