//! Error types for bucketkv
//!
//! Provides a unified error type for all lifecycle and transaction operations.
//! Every variant that involves the database file carries its path.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::client::LifecycleState;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for bucketkv operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Open Errors
    // -------------------------------------------------------------------------
    #[error("unable to create directory {}: {source}", path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "timed out after {timeout:?} waiting for the lock on {}; \
         another process or client has the store open",
        path.display()
    )]
    OpenTimeout { path: PathBuf, timeout: Duration },

    #[error(
        "unable to open store: the filesystem holding {} may not support the shared \
         file mapping and locking the store requires; move the database to a local filesystem",
        path.display()
    )]
    IncompatibleFilesystem { path: PathBuf },

    #[error("unable to open store at {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    #[error("unable to create bucket {bucket:?} in {}: {message}", path.display())]
    NamespaceInit {
        path: PathBuf,
        bucket: String,
        message: String,
    },

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("store at {} is not open", path.display())]
    NotOpen { path: PathBuf },

    #[error("store at {} has been closed", path.display())]
    Closed { path: PathBuf },

    #[error("cannot open store at {} from state {state:?}", path.display())]
    InvalidState {
        path: PathBuf,
        state: LifecycleState,
    },

    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("bucket name required")]
    BucketNameRequired,

    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("transaction error: {0}")]
    Transaction(String),
}
