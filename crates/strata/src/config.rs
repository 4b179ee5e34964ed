//! Configuration for Strata.
//!
//! Configuration lives in `.strata/config.yaml` next to the database:
//!
//! ```yaml
//! max-depth: 16
//! storage:
//!   database: strata.db
//!   busy-timeout-ms: 5000
//! cache:
//!   mode: enabled
//!   ttl-secs: 300
//!   max-capacity: 10000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the strata directory
pub const STRATA_DIR_NAME: &str = ".strata";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default database file name (relative to the strata directory)
pub const DEFAULT_DATABASE_NAME: &str = "strata.db";

/// Default maximum hierarchy depth (root = 0).
pub const DEFAULT_MAX_DEPTH: u32 = 16;

/// Hard limit on recursive traversal hops.
///
/// `max-depth` may not exceed this; traversals stop here even on corrupted data.
pub const TRAVERSAL_LIMIT: u32 = 1024;

/// Maximum directory depth to traverse when searching for the strata directory
pub const MAX_DISCOVERY_DEPTH: usize = 256;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct StrataConfig {
    /// Maximum allowed hierarchy depth; create and reparent beyond it are rejected
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    /// Database file, relative to the strata directory unless absolute
    pub database: String,

    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE_NAME.to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl StorageConfig {
    /// Busy timeout as a `Duration`.
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Whether hierarchy results are memoized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Memoize reads, invalidate synchronously on writes
    #[default]
    Enabled,
    /// Always compute directly
    Disabled,
}

/// Cache configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheConfig {
    /// Cache mode
    pub mode: CacheMode,

    /// Optional time-to-live backstop; invalidation is the primary mechanism
    pub ttl_secs: Option<u64>,

    /// Maximum number of cached results
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::Enabled,
            ttl_secs: Some(300),
            max_capacity: 10_000,
        }
    }
}

impl CacheConfig {
    /// A configuration that never caches.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            mode: CacheMode::Disabled,
            ..Self::default()
        }
    }

    /// TTL as a `Duration`, if configured.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl StrataConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `max-depth` is outside `1..=TRAVERSAL_LIMIT`
    /// or the cache capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 || self.max_depth > TRAVERSAL_LIMIT {
            return Err(Error::Config(format!(
                "max-depth must be between 1 and {TRAVERSAL_LIMIT}, got {}",
                self.max_depth
            )));
        }
        if self.cache.max_capacity == 0 {
            return Err(Error::Config(
                "cache.max-capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the database path relative to the strata directory.
    #[must_use]
    pub fn database_path(&self, strata_dir: &Path) -> PathBuf {
        let db = Path::new(&self.storage.database);
        if db.is_absolute() {
            db.to_path_buf()
        } else {
            strata_dir.join(db)
        }
    }
}

/// Walk up from `start` looking for a `.strata` directory.
///
/// Returns the path of the `.strata` directory itself.
#[must_use]
pub fn find_strata_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(MAX_DISCOVERY_DEPTH)
        .map(|dir| dir.join(STRATA_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}
