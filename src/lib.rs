//! # bucketkv
//!
//! Lifecycle wrapper around an embedded, transactional on-disk key-value store:
//! - Creates the containing directory and database file on first open
//! - Bounded wait for the exclusive file lock held by another opener
//! - Idempotent creation of a configured set of buckets
//! - Scoped read/write transactions through `TransactionRunner`
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Collaborators                             │
//! │            (update / view via TransactionRunner)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ &Store
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Client                                  │
//! │          open → initialize buckets → close                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Filesystem  │          │    redb     │
//!   │ (dir, file) │          │ (B+tree,    │
//!   └─────────────┘          │  ACID txns) │
//!                            └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use bucketkv::{Client, StoreConfig, TransactionRunner};
//!
//! # fn main() -> bucketkv::Result<()> {
//! let config = StoreConfig::builder()
//!     .path("./data/app.redb")
//!     .buckets(["bucketsv1", "sessions"])
//!     .build();
//!
//! let mut client = Client::new(config);
//! client.open()?;
//!
//! let store = client.store()?;
//! store.update(|tx| tx.put("sessions", b"abc", b"user-1"))?;
//! let value = store.view(|tx| tx.get("sessions", b"abc"))?;
//! assert_eq!(value, Some(b"user-1".to_vec()));
//!
//! client.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod client;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::StoreConfig;
pub use client::{Client, LifecycleState};
pub use store::{ReadTx, Store, TransactionRunner, WriteTx};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bucketkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
