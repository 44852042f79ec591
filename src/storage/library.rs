use super::db::{self, Database, DatabaseError};
use super::models::{Archivo, Folder};
use super::tables::*;

impl Database {
    // ========================================================================
    // Folder operations
    // ========================================================================

    pub fn put_folder(&self, folder: &Folder) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        db::store_doc(&write_txn, FOLDERS, &folder.id, folder)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_folder(&self, id: &str) -> Result<Option<Folder>, DatabaseError> {
        self.get_doc(FOLDERS, id)
    }

    pub fn all_folders(&self) -> Result<Vec<Folder>, DatabaseError> {
        self.all_docs(FOLDERS)
    }

    /// Folders whose parent is `parent` (`None` = root).
    pub fn child_folders(&self, parent: Option<&str>) -> Result<Vec<Folder>, DatabaseError> {
        Ok(self
            .all_folders()?
            .into_iter()
            .filter(|f| f.parent.as_deref() == parent)
            .collect())
    }

    /// Remove a folder, every folder below it and all of their files in one
    /// transaction. Returns the removed files so their content can be deleted.
    pub fn delete_folder_tree(&self, id: &str) -> Result<Option<Vec<Archivo>>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let folders: Vec<Folder> = db::load_all_docs(&write_txn, FOLDERS)?;
        if !folders.iter().any(|f| f.id == id) {
            write_txn.abort()?;
            return Ok(None);
        }

        let mut doomed = vec![id.to_string()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let current = doomed[cursor].clone();
            doomed.extend(
                folders
                    .iter()
                    .filter(|f| f.parent.as_deref() == Some(current.as_str()))
                    .map(|f| f.id.clone()),
            );
            cursor += 1;
        }

        let files: Vec<Archivo> = db::load_all_docs::<Archivo>(&write_txn, ARCHIVOS)?
            .into_iter()
            .filter(|a| a.folder.as_ref().is_some_and(|f| doomed.contains(f)))
            .collect();

        for file in &files {
            db::remove_doc(&write_txn, ARCHIVOS, &file.id)?;
            db::key_remove(&write_txn, ARCHIVO_KEYS, &file.key)?;
        }
        for folder_id in &doomed {
            db::remove_doc(&write_txn, FOLDERS, folder_id)?;
        }
        write_txn.commit()?;

        Ok(Some(files))
    }

    // ========================================================================
    // Library file operations
    // ========================================================================

    pub fn put_file(&self, file: &Archivo) -> Result<(), DatabaseError> {
        debug_assert!(!file.id.is_empty(), "file id must not be empty");

        let write_txn = self.begin_write()?;
        db::store_doc(&write_txn, ARCHIVOS, &file.id, file)?;
        db::key_insert(&write_txn, ARCHIVO_KEYS, &file.key, &file.id)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_file(&self, id: &str) -> Result<Option<Archivo>, DatabaseError> {
        self.get_doc(ARCHIVOS, id)
    }

    /// Look a file record up by the storage key its content lives under.
    pub fn get_file_by_key(&self, key: &str) -> Result<Option<Archivo>, DatabaseError> {
        match self.lookup_key(ARCHIVO_KEYS, key)? {
            Some(id) => self.get_file(&id),
            None => Ok(None),
        }
    }

    pub fn all_files(&self) -> Result<Vec<Archivo>, DatabaseError> {
        self.all_docs(ARCHIVOS)
    }

    /// Files directly inside `folder` (`None` = root).
    pub fn files_in_folder(&self, folder: Option<&str>) -> Result<Vec<Archivo>, DatabaseError> {
        Ok(self
            .all_files()?
            .into_iter()
            .filter(|a| a.folder.as_deref() == folder)
            .collect())
    }

    /// Atomically modify a library file. `Ok(None)` when it does not exist.
    pub fn modify_file<T, E, F>(&self, id: &str, f: F) -> Result<Option<(Archivo, T)>, E>
    where
        E: From<DatabaseError>,
        F: FnOnce(&mut Archivo) -> Result<T, E>,
    {
        let write_txn = self.begin_write()?;
        let Some(mut file) = db::load_doc::<Archivo>(&write_txn, ARCHIVOS, id)? else {
            write_txn.abort().map_err(DatabaseError::from)?;
            return Ok(None);
        };
        let out = match f(&mut file) {
            Ok(out) => out,
            Err(e) => {
                write_txn.abort().map_err(DatabaseError::from)?;
                return Err(e);
            }
        };
        file.updated_at = chrono::Utc::now();
        db::store_doc(&write_txn, ARCHIVOS, id, &file)?;
        write_txn.commit().map_err(DatabaseError::from)?;
        Ok(Some((file, out)))
    }

    /// Delete a library file record. Returns the removed record.
    pub fn delete_file(&self, id: &str) -> Result<Option<Archivo>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = db::load_doc::<Archivo>(&write_txn, ARCHIVOS, id)?;
        if let Some(ref file) = removed {
            db::remove_doc(&write_txn, ARCHIVOS, id)?;
            db::key_remove(&write_txn, ARCHIVO_KEYS, &file.key)?;
        }
        write_txn.commit()?;
        Ok(removed)
    }
}
