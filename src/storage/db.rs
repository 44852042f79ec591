use redb::{
    Database as RedbDatabase, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;

/// A collection of msgpack documents keyed by id.
pub type DocTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// A unique string index: value -> document id.
pub type KeyIndex = TableDefinition<'static, &'static str, &'static str>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for DatabaseError {
    fn from(e: redb::Error) -> Self {
        DatabaseError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

/// Handle to the document store. Cheap to clone.
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("komuness.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        // Initialize application tables
        let write_txn = db.begin_write()?;
        {
            for def in [
                USERS,
                PUBLICATIONS,
                AUTHOR_PUBLICATIONS,
                CATEGORIES,
                FOLDERS,
                ARCHIVOS,
                PAYMENTS,
                SETTINGS,
                BLOB_META,
                BLOB_DATA,
            ] {
                let _ = write_txn.open_table(def)?;
            }
            for def in [USER_EMAILS, CATEGORY_NAMES, ARCHIVO_KEYS, PAYMENT_REFS] {
                let _ = write_txn.open_table(def)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    /// Fetch one document by id.
    pub(super) fn get_doc<T: DeserializeOwned>(
        &self,
        def: DocTable,
        id: &str,
    ) -> Result<Option<T>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(def)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Fetch every document of a collection.
    pub(super) fn all_docs<T: DeserializeOwned>(&self, def: DocTable) -> Result<Vec<T>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(def)?;

        let mut docs = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            docs.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(docs)
    }

    /// Resolve a unique index entry to its document id.
    pub(super) fn lookup_key(&self, def: KeyIndex, key: &str) -> Result<Option<String>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(def)?;
        let id = table.get(key)?.map(|v| v.value().to_string());
        Ok(id)
    }
}

// ============================================================================
// Write-transaction helpers
// ============================================================================

pub(super) fn load_doc<T: DeserializeOwned>(
    txn: &WriteTransaction,
    def: DocTable,
    id: &str,
) -> Result<Option<T>, DatabaseError> {
    let table = txn.open_table(def)?;
    let result = match table.get(id)? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };
    Ok(result)
}

/// Every document of a collection, read inside a write transaction.
pub(super) fn load_all_docs<T: DeserializeOwned>(
    txn: &WriteTransaction,
    def: DocTable,
) -> Result<Vec<T>, DatabaseError> {
    let table = txn.open_table(def)?;
    let mut docs = Vec::new();
    for result in table.iter()? {
        let (_, value) = result?;
        docs.push(rmp_serde::from_slice(value.value())?);
    }
    Ok(docs)
}

pub(super) fn store_doc<T: Serialize>(
    txn: &WriteTransaction,
    def: DocTable,
    id: &str,
    doc: &T,
) -> Result<(), DatabaseError> {
    let data = rmp_serde::to_vec_named(doc)?;
    let mut table = txn.open_table(def)?;
    table.insert(id, data.as_slice())?;
    Ok(())
}

pub(super) fn remove_doc(txn: &WriteTransaction, def: DocTable, id: &str) -> Result<bool, DatabaseError> {
    let mut table = txn.open_table(def)?;
    let removed = table.remove(id)?.is_some();
    Ok(removed)
}

pub(super) fn index_ids(
    txn: &WriteTransaction,
    def: DocTable,
    key: &str,
) -> Result<Vec<String>, DatabaseError> {
    Ok(load_doc::<Vec<String>>(txn, def, key)?.unwrap_or_default())
}

/// Append an id to a one-to-many index entry.
pub(super) fn index_add(
    txn: &WriteTransaction,
    def: DocTable,
    key: &str,
    id: &str,
) -> Result<(), DatabaseError> {
    let mut ids = index_ids(txn, def, key)?;
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
        store_doc(txn, def, key, &ids)?;
    }
    Ok(())
}

/// Remove an id from a one-to-many index entry, dropping the entry when empty.
pub(super) fn index_remove(
    txn: &WriteTransaction,
    def: DocTable,
    key: &str,
    id: &str,
) -> Result<(), DatabaseError> {
    let mut ids = index_ids(txn, def, key)?;
    ids.retain(|existing| existing != id);
    if ids.is_empty() {
        remove_doc(txn, def, key)?;
    } else {
        store_doc(txn, def, key, &ids)?;
    }
    Ok(())
}

pub(super) fn key_exists(txn: &WriteTransaction, def: KeyIndex, key: &str) -> Result<bool, DatabaseError> {
    let table = txn.open_table(def)?;
    let exists = table.get(key)?.is_some();
    Ok(exists)
}

pub(super) fn key_insert(
    txn: &WriteTransaction,
    def: KeyIndex,
    key: &str,
    id: &str,
) -> Result<(), DatabaseError> {
    let mut table = txn.open_table(def)?;
    table.insert(key, id)?;
    Ok(())
}

pub(super) fn key_remove(txn: &WriteTransaction, def: KeyIndex, key: &str) -> Result<(), DatabaseError> {
    let mut table = txn.open_table(def)?;
    table.remove(key)?;
    Ok(())
}
