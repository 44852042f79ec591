use super::db::{self, Database, DatabaseError};
use super::models::Setting;
use super::tables::*;

impl Database {
    // ========================================================================
    // Settings
    // ========================================================================

    pub fn get_setting(&self, key: &str) -> Result<Option<Setting>, DatabaseError> {
        self.get_doc(SETTINGS, key)
    }

    /// Insert or replace a setting.
    pub fn put_setting(&self, key: &str, value: i64) -> Result<Setting, DatabaseError> {
        let setting = Setting {
            key: key.to_string(),
            value,
            updated_at: chrono::Utc::now(),
        };
        let write_txn = self.begin_write()?;
        db::store_doc(&write_txn, SETTINGS, key, &setting)?;
        write_txn.commit()?;
        Ok(setting)
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = db::remove_doc(&write_txn, SETTINGS, key)?;
        write_txn.commit()?;
        Ok(removed)
    }
}
