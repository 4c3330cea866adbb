//! Store Module
//!
//! Narrow transaction interface over the embedded engine handle.
//!
//! ## Responsibilities
//! - Own the live engine handle between open and close
//! - Run scoped read/write transactions (`TransactionRunner`)
//! - Keep engine types out of the public API
//!
//! ## Transaction Scoping
//! ```text
//!   update(|tx| ...)                 view(|tx| ...)
//!        │                                │
//!        ▼                                ▼
//!   begin_write ──► closure         begin_read ──► closure
//!        │                                │
//!    Ok ─┴─► commit                       └─► snapshot dropped
//!   Err ────► abort (no changes)
//! ```

mod txn;

use std::path::{Path, PathBuf};

use redb::{Database, Durability};

use crate::error::Result;

pub use txn::{ReadTx, WriteTx};

/// Scoped transaction execution against an open store
///
/// Collaborators receive this capability instead of the raw engine handle.
pub trait TransactionRunner {
    /// Run `f` inside one write transaction.
    ///
    /// Commits when `f` returns `Ok`; aborts and propagates the error otherwise.
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTx) -> Result<T>;

    /// Run `f` against a read-only snapshot.
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTx) -> Result<T>;
}

/// Live handle to an open database file
///
/// Only `Client` constructs and releases a `Store`; everyone else borrows it.
pub struct Store {
    db: Database,
    path: PathBuf,
    no_sync: bool,
}

impl Store {
    pub(crate) fn new(db: Database, path: PathBuf, no_sync: bool) -> Self {
        Self { db, path, no_sync }
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether commits skip fsync
    pub fn is_no_sync(&self) -> bool {
        self.no_sync
    }

    pub(crate) fn begin_write(&self) -> Result<WriteTx> {
        let mut tx = self.db.begin_write().map_err(txn::engine_err)?;
        tx.set_durability(self.durability());
        WriteTx::new(tx)
    }

    pub(crate) fn begin_read(&self) -> Result<ReadTx> {
        let tx = self.db.begin_read().map_err(txn::engine_err)?;
        Ok(ReadTx::new(tx))
    }

    /// Commit an empty transaction with immediate durability.
    ///
    /// Forces commits made without fsync onto disk.
    pub(crate) fn sync(&self) -> Result<()> {
        let mut tx = self.db.begin_write().map_err(txn::engine_err)?;
        tx.set_durability(Durability::Immediate);
        tx.commit().map_err(txn::engine_err)
    }

    fn durability(&self) -> Durability {
        if self.no_sync {
            Durability::Eventual
        } else {
            Durability::Immediate
        }
    }
}

impl TransactionRunner for Store {
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTx) -> Result<T>,
    {
        let mut tx = self.begin_write()?;
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = tx.abort() {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %abort_err,
                        "abort after failed update did not complete"
                    );
                }
                Err(e)
            }
        }
    }

    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTx) -> Result<T>,
    {
        let tx = self.begin_read()?;
        f(&tx)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("no_sync", &self.no_sync)
            .finish_non_exhaustive()
    }
}
