//! Configuration for bucketkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Bucket created by default on every open.
pub const DEFAULT_BUCKET: &str = "bucketsv1";

/// Main configuration for a bucketkv client
#[derive(Debug, Clone)]
pub struct StoreConfig {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the database file. Missing parent directories are created on open.
    pub path: PathBuf,

    /// Buckets that must exist once the store is open.
    /// Created idempotently inside a single write transaction.
    pub buckets: Vec<String>,

    /// Engine page cache size in bytes (`None` keeps the engine default)
    pub cache_size: Option<usize>,

    // -------------------------------------------------------------------------
    // Durability / Locking Configuration
    // -------------------------------------------------------------------------
    /// How long open waits for another holder to release the file lock.
    /// `Duration::ZERO` waits indefinitely.
    pub open_timeout: Duration,

    /// Skip fsync on commit (faster, not durable; for tests and scratch stores)
    pub no_sync: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./bucketkv_data/bucketkv.redb"),
            buckets: vec![DEFAULT_BUCKET.to_string()],
            cache_size: None,
            open_timeout: Duration::from_secs(1),
            no_sync: false,
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Bucket names in configured order with duplicates removed
    pub fn required_buckets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.buckets.len());
        for name in &self.buckets {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct ConfigBuilder {
    config: StoreConfig,
}

impl ConfigBuilder {
    /// Set the database file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Replace the list of required buckets
    pub fn buckets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.buckets = names.into_iter().map(Into::into).collect();
        self
    }

    /// Add one required bucket to the list
    pub fn bucket(mut self, name: impl Into<String>) -> Self {
        self.config.buckets.push(name.into());
        self
    }

    /// Set the engine page cache size (in bytes)
    pub fn cache_size(mut self, bytes: usize) -> Self {
        self.config.cache_size = Some(bytes);
        self
    }

    /// Set the lock wait timeout used by open
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.config.open_timeout = timeout;
        self
    }

    /// Disable fsync on commit
    pub fn no_sync(mut self, no_sync: bool) -> Self {
        self.config.no_sync = no_sync;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}
