//! Scoped Transactions
//!
//! Bucket-level views over engine read and write transactions.
//! A bucket is an engine table keyed and valued by raw bytes.

use std::collections::BTreeSet;

use redb::{
    ReadTransaction, ReadableTable, ReadableTableMetadata, TableDefinition, TableError,
    TableHandle, WriteTransaction,
};

use crate::error::{Result, StoreError};

type Raw = &'static [u8];

/// Table definition for a bucket. The engine rejects empty table names.
fn definition(bucket: &str) -> Result<TableDefinition<'_, Raw, Raw>> {
    if bucket.is_empty() {
        return Err(StoreError::BucketNameRequired);
    }
    Ok(TableDefinition::new(bucket))
}

pub(crate) fn engine_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Transaction(e.to_string())
}

fn table_err(bucket: &str, e: TableError) -> StoreError {
    match e {
        TableError::TableDoesNotExist(_) => StoreError::BucketNotFound(bucket.to_string()),
        other => engine_err(other),
    }
}

fn get_from<T: ReadableTable<Raw, Raw>>(table: &T, key: &[u8]) -> Result<Option<Vec<u8>>> {
    let value = table.get(key).map_err(engine_err)?;
    Ok(value.map(|guard| guard.value().to_vec()))
}

fn for_each_in<T, F>(table: &T, mut f: F) -> Result<()>
where
    T: ReadableTable<Raw, Raw>,
    F: FnMut(&[u8], &[u8]) -> Result<()>,
{
    for entry in table.iter().map_err(engine_err)? {
        let (key, value) = entry.map_err(engine_err)?;
        f(key.value(), value.value())?;
    }
    Ok(())
}

// =============================================================================
// Read Transaction
// =============================================================================

/// Read-only snapshot of the store
pub struct ReadTx {
    tx: ReadTransaction,
}

impl ReadTx {
    pub(crate) fn new(tx: ReadTransaction) -> Self {
        Self { tx }
    }

    /// Names of all buckets in the snapshot
    pub fn bucket_names(&self) -> Result<Vec<String>> {
        let tables = self.tx.list_tables().map_err(engine_err)?;
        Ok(tables.map(|handle| handle.name().to_string()).collect())
    }

    pub fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.bucket_names()?.iter().any(|name| name == bucket))
    }

    /// Get a value by key
    ///
    /// Returns:
    /// - `Ok(Some(value))` — key present
    /// - `Ok(None)` — key absent
    /// - `Err(BucketNotFound)` — bucket missing
    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = self
            .tx
            .open_table(definition(bucket)?)
            .map_err(|e| table_err(bucket, e))?;
        get_from(&table, key)
    }

    /// Visit every entry of a bucket in ascending key order
    pub fn for_each<F>(&self, bucket: &str, f: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        let table = self
            .tx
            .open_table(definition(bucket)?)
            .map_err(|e| table_err(bucket, e))?;
        for_each_in(&table, f)
    }

    /// Number of keys in a bucket
    pub fn len(&self, bucket: &str) -> Result<u64> {
        let table = self
            .tx
            .open_table(definition(bucket)?)
            .map_err(|e| table_err(bucket, e))?;
        table.len().map_err(engine_err)
    }
}

// =============================================================================
// Write Transaction
// =============================================================================

/// Read-write view of the store inside an `update`
///
/// Changes become visible to other transactions only after the enclosing
/// `update` commits.
pub struct WriteTx {
    tx: WriteTransaction,
    /// Bucket names as of this transaction, kept current by create/delete.
    /// `open_table` on a write transaction creates missing tables, so every
    /// access checks here first.
    buckets: BTreeSet<String>,
}

impl WriteTx {
    pub(crate) fn new(tx: WriteTransaction) -> Result<Self> {
        let buckets = tx
            .list_tables()
            .map_err(engine_err)?
            .map(|handle| handle.name().to_string())
            .collect();
        Ok(Self { tx, buckets })
    }

    pub(crate) fn commit(self) -> Result<()> {
        self.tx.commit().map_err(engine_err)
    }

    pub(crate) fn abort(self) -> Result<()> {
        self.tx.abort().map_err(engine_err)
    }

    /// Names of all buckets, including ones created in this transaction
    pub fn bucket_names(&self) -> Result<Vec<String>> {
        Ok(self.buckets.iter().cloned().collect())
    }

    pub fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.contains(bucket))
    }

    /// Create a bucket unless it already exists
    ///
    /// Returns `true` when the bucket was created by this call.
    pub fn create_bucket_if_not_exists(&mut self, bucket: &str) -> Result<bool> {
        let def = definition(bucket)?;
        if self.buckets.contains(bucket) {
            return Ok(false);
        }

        let table = self.tx.open_table(def).map_err(|e| table_err(bucket, e))?;
        drop(table);

        self.buckets.insert(bucket.to_string());
        Ok(true)
    }

    /// Delete a bucket and all of its keys
    ///
    /// Returns `true` when the bucket existed.
    pub fn delete_bucket(&mut self, bucket: &str) -> Result<bool> {
        let existed = self
            .tx
            .delete_table(definition(bucket)?)
            .map_err(|e| table_err(bucket, e))?;
        self.buckets.remove(bucket);
        Ok(existed)
    }

    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let def = self.existing(bucket)?;
        let table = self.tx.open_table(def).map_err(|e| table_err(bucket, e))?;
        get_from(&table, key)
    }

    pub fn for_each<F>(&self, bucket: &str, f: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        let def = self.existing(bucket)?;
        let table = self.tx.open_table(def).map_err(|e| table_err(bucket, e))?;
        for_each_in(&table, f)
    }

    pub fn len(&self, bucket: &str) -> Result<u64> {
        let def = self.existing(bucket)?;
        let table = self.tx.open_table(def).map_err(|e| table_err(bucket, e))?;
        table.len().map_err(engine_err)
    }

    /// Put a key-value pair into an existing bucket
    pub fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let def = self.existing(bucket)?;
        let mut table = self.tx.open_table(def).map_err(|e| table_err(bucket, e))?;
        table.insert(key, value).map_err(engine_err)?;
        Ok(())
    }

    /// Delete a key
    ///
    /// Returns `true` when the key existed.
    pub fn delete(&mut self, bucket: &str, key: &[u8]) -> Result<bool> {
        let def = self.existing(bucket)?;
        let mut table = self.tx.open_table(def).map_err(|e| table_err(bucket, e))?;
        let existed = table.remove(key).map_err(engine_err)?.is_some();
        Ok(existed)
    }

    fn existing<'b>(&self, bucket: &'b str) -> Result<TableDefinition<'b, Raw, Raw>> {
        let def = definition(bucket)?;
        if self.buckets.contains(bucket) {
            Ok(def)
        } else {
            Err(StoreError::BucketNotFound(bucket.to_string()))
        }
    }
}
