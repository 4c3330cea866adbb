//! Client Module
//!
//! Lifecycle manager for the on-disk store.
//!
//! ## Responsibilities
//! - Create the containing directory and the database file
//! - Open the file, waiting a bounded time for the exclusive lock
//! - Create the configured buckets on first use
//! - Hand out the open store and release it on close
//!
//! ## Lifecycle
//! ```text
//!   Unopened ──open()──► Open ──close()──► Closed
//!      │                                     ▲
//!      └──────────────close() (no-op)────────┘ (stays Unopened)
//! ```

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use redb::{Builder, Database, DatabaseError, StorageError};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::store::Store;

/// How often open re-checks a lock held by someone else
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where a client is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unopened,
    Open,
    Closed,
}

/// Owns the store handle from open to close
///
/// ## Concurrency:
/// - `open` and `close` take `&mut self`; one caller at a time
/// - `store()` borrows the handle, so `close` cannot run while it is in use
/// - Transactions on the borrowed `Store` follow the engine's
///   single-writer / multi-reader rules
pub struct Client {
    config: StoreConfig,
    store: Option<Store>,
    state: LifecycleState,
}

impl Client {
    /// Create an unopened client. No I/O happens until `open`.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            store: None,
            state: LifecycleState::Unopened,
        }
    }

    /// Open or create the store
    ///
    /// On open:
    /// 1. Create the parent directory if it doesn't exist
    /// 2. Create the database file if it doesn't exist
    /// 3. Open it, waiting up to `open_timeout` for the file lock
    /// 4. Create any missing buckets
    pub fn open(&mut self) -> Result<()> {
        if self.state != LifecycleState::Unopened {
            return Err(StoreError::InvalidState {
                path: self.config.path.clone(),
                state: self.state,
            });
        }

        let path = self.config.path.clone();

        // Step 1: Parent directory
        ensure_parent_dir(&path)?;

        // Step 2: Database file
        match fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => create_db_file(&path)?,
            Err(e) => {
                return Err(StoreError::Open {
                    path,
                    message: e.to_string(),
                })
            }
        }

        // Step 3: Engine handle
        let db = acquire(&path, &self.config)?;
        let store = Store::new(db, path.clone(), self.config.no_sync);

        // Step 4: Buckets. On failure `store` drops here and the lock is released.
        initialize(&store, &self.config.required_buckets())?;

        tracing::info!(path = %path.display(), "Resources opened");

        self.store = Some(store);
        self.state = LifecycleState::Open;
        Ok(())
    }

    /// Release the store
    ///
    /// No-op on a client that was never opened or is already closed.
    /// With `no_sync` enabled, pending commits are forced to disk first.
    pub fn close(&mut self) -> Result<()> {
        let Some(store) = self.store.take() else {
            return Ok(());
        };
        self.state = LifecycleState::Closed;

        let result = if store.is_no_sync() {
            store.sync()
        } else {
            Ok(())
        };

        drop(store);
        tracing::debug!(path = %self.config.path.display(), "Resources closed");

        result
    }

    /// The open store
    ///
    /// Fails with `NotOpen` before `open` succeeds and `Closed` after `close`.
    pub fn store(&self) -> Result<&Store> {
        match (&self.store, self.state) {
            (Some(store), LifecycleState::Open) => Ok(store),
            (_, LifecycleState::Closed) => Err(StoreError::Closed {
                path: self.config.path.clone(),
            }),
            _ => Err(StoreError::NotOpen {
                path: self.config.path.clone(),
            }),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Get the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == LifecycleState::Open
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.store.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!(
                    path = %self.config.path.display(),
                    error = %e,
                    "close on drop failed"
                );
            }
        }
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

/// Create the directory holding `path` (owner-only on unix)
fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    builder.create(dir).map_err(|source| StoreError::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })
}

/// Create an empty database file (owner read/write on unix).
/// The engine initializes empty files on open.
fn create_db_file(path: &Path) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    match options.open(path) {
        Ok(_) => Ok(()),
        // Lost a race with another opener; their file is as good as ours
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(StoreError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

/// Open the engine, polling while another holder has the file locked
fn acquire(path: &Path, config: &StoreConfig) -> Result<Database> {
    let mut builder = Builder::new();
    if let Some(bytes) = config.cache_size {
        builder.set_cache_size(bytes);
    }

    let timeout = config.open_timeout;
    let started = Instant::now();
    let mut contended = false;

    loop {
        match builder.create(path) {
            Ok(db) => {
                if contended {
                    tracing::debug!(
                        path = %path.display(),
                        waited_ms = started.elapsed().as_millis() as u64,
                        "Acquired store lock"
                    );
                }
                return Ok(db);
            }
            Err(DatabaseError::DatabaseAlreadyOpen) => {
                if !contended {
                    tracing::warn!(
                        path = %path.display(),
                        timeout_ms = timeout.as_millis() as u64,
                        "Store is locked by another holder, waiting"
                    );
                    contended = true;
                }
                if !timeout.is_zero() && started.elapsed() >= timeout {
                    return Err(StoreError::OpenTimeout {
                        path: path.to_path_buf(),
                        timeout,
                    });
                }
                thread::sleep(LOCK_POLL_INTERVAL);
            }
            Err(e) => return Err(classify_open_error(path, e)),
        }
    }
}

/// Translate an engine open failure
///
/// EINVAL from the file layer means the filesystem rejected the shared
/// mapping or locking calls; report that plainly instead of "invalid argument".
fn classify_open_error(path: &Path, err: DatabaseError) -> StoreError {
    match err {
        DatabaseError::Storage(StorageError::Io(ref io)) if is_invalid_argument(io) => {
            StoreError::IncompatibleFilesystem {
                path: path.to_path_buf(),
            }
        }
        other => StoreError::Open {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

fn is_invalid_argument(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::InvalidInput
}

/// Create every required bucket inside one write transaction.
/// Nothing is committed unless all of them succeed.
fn initialize(store: &Store, buckets: &[&str]) -> Result<()> {
    let mut tx = store.begin_write()?;

    for bucket in buckets {
        match tx.create_bucket_if_not_exists(bucket) {
            Ok(true) => tracing::debug!(bucket = %bucket, "Created bucket"),
            Ok(false) => {}
            Err(e) => {
                if let Err(abort_err) = tx.abort() {
                    tracing::warn!(
                        path = %store.path().display(),
                        error = %abort_err,
                        "abort after failed bucket initialization did not complete"
                    );
                }
                return Err(StoreError::NamespaceInit {
                    path: store.path().to_path_buf(),
                    bucket: bucket.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    tx.commit().map_err(|e| StoreError::NamespaceInit {
        path: store.path().to_path_buf(),
        bucket: buckets.join(","),
        message: e.to_string(),
    })
}
