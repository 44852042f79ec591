use super::db::{self, Database, DatabaseError};
use super::models::Category;
use super::tables::*;

fn name_key(nombre: &str) -> String {
    nombre.trim().to_lowercase()
}

impl Database {
    // ========================================================================
    // Category operations
    // ========================================================================

    /// Insert a category unless the name is taken (case-insensitive).
    pub fn insert_category(&self, category: &Category) -> Result<bool, DatabaseError> {
        let key = name_key(&category.nombre);
        let write_txn = self.begin_write()?;
        if db::key_exists(&write_txn, CATEGORY_NAMES, &key)? {
            write_txn.abort()?;
            return Ok(false);
        }
        db::store_doc(&write_txn, CATEGORIES, &category.id, category)?;
        db::key_insert(&write_txn, CATEGORY_NAMES, &key, &category.id)?;
        write_txn.commit()?;
        Ok(true)
    }

    pub fn get_category(&self, id: &str) -> Result<Option<Category>, DatabaseError> {
        self.get_doc(CATEGORIES, id)
    }

    pub fn get_category_by_name(&self, nombre: &str) -> Result<Option<Category>, DatabaseError> {
        match self.lookup_key(CATEGORY_NAMES, &name_key(nombre))? {
            Some(id) => self.get_category(&id),
            None => Ok(None),
        }
    }

    /// All categories sorted by name
    pub fn list_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let mut categories: Vec<Category> = self.all_docs(CATEGORIES)?;
        categories.sort_by_key(|c| name_key(&c.nombre));
        Ok(categories)
    }

    /// Rename and/or toggle a category. Returns `Ok(None)` when the category does
    /// not exist and `Err`-free `Some(false)` when the new name is taken.
    pub fn update_category(
        &self,
        id: &str,
        nombre: Option<&str>,
        activo: Option<bool>,
    ) -> Result<Option<bool>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let Some(mut category) = db::load_doc::<Category>(&write_txn, CATEGORIES, id)? else {
            write_txn.abort()?;
            return Ok(None);
        };

        if let Some(new_name) = nombre {
            let old_key = name_key(&category.nombre);
            let new_key = name_key(new_name);
            if new_key != old_key {
                if db::key_exists(&write_txn, CATEGORY_NAMES, &new_key)? {
                    write_txn.abort()?;
                    return Ok(Some(false));
                }
                db::key_remove(&write_txn, CATEGORY_NAMES, &old_key)?;
                db::key_insert(&write_txn, CATEGORY_NAMES, &new_key, id)?;
            }
            category.nombre = new_name.trim().to_string();
        }
        if let Some(a) = activo {
            category.activo = a;
        }

        db::store_doc(&write_txn, CATEGORIES, id, &category)?;
        write_txn.commit()?;
        Ok(Some(true))
    }
}
