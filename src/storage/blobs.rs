use bytes::Bytes;

use super::db::{self, Database, DatabaseError};
use super::models::BlobMeta;
use super::tables::*;

impl Database {
    // ========================================================================
    // Blob operations
    // ========================================================================

    /// Store blob bytes and their metadata under `meta.id`.
    pub fn put_blob(&self, meta: &BlobMeta, data: &[u8]) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        db::store_doc(&write_txn, BLOB_META, &meta.id, meta)?;
        {
            let mut table = write_txn.open_table(BLOB_DATA)?;
            table.insert(meta.id.as_str(), data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_blob(&self, id: &str) -> Result<Option<(BlobMeta, Bytes)>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let meta_table = read_txn.open_table(BLOB_META)?;
        let data_table = read_txn.open_table(BLOB_DATA)?;

        let meta: BlobMeta = match meta_table.get(id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(None),
        };
        let data = match data_table.get(id)? {
            Some(data) => Bytes::copy_from_slice(data.value()),
            None => return Ok(None),
        };
        Ok(Some((meta, data)))
    }

    /// Delete a blob. Returns false when it did not exist.
    pub fn delete_blob(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = db::remove_doc(&write_txn, BLOB_META, id)?;
        db::remove_doc(&write_txn, BLOB_DATA, id)?;
        write_txn.commit()?;
        Ok(removed)
    }
}
