use super::db::{self, Database, DatabaseError};
use super::models::User;
use super::tables::*;

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Insert a user unless the email is already taken. Returns false on conflict.
    pub fn insert_user(&self, user: &User) -> Result<bool, DatabaseError> {
        debug_assert!(!user.id.is_empty(), "user id must not be empty");

        let email = user.email.to_lowercase();
        let write_txn = self.begin_write()?;
        if db::key_exists(&write_txn, USER_EMAILS, &email)? {
            write_txn.abort()?;
            return Ok(false);
        }
        db::store_doc(&write_txn, USERS, &user.id, user)?;
        db::key_insert(&write_txn, USER_EMAILS, &email, &user.id)?;
        write_txn.commit()?;
        Ok(true)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        self.get_doc(USERS, id)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        match self.lookup_key(USER_EMAILS, &email.trim().to_lowercase())? {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let mut users: Vec<User> = self.all_docs(USERS)?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    pub fn count_users(&self) -> Result<usize, DatabaseError> {
        Ok(self.all_docs::<User>(USERS)?.len())
    }

    /// Atomically modify a user. `Ok(None)` when the user does not exist;
    /// an error from `f` aborts the transaction.
    pub fn modify_user<T, E, F>(&self, id: &str, f: F) -> Result<Option<(User, T)>, E>
    where
        E: From<DatabaseError>,
        F: FnOnce(&mut User) -> Result<T, E>,
    {
        let write_txn = self.begin_write()?;
        let Some(mut user) = db::load_doc::<User>(&write_txn, USERS, id)? else {
            write_txn.abort().map_err(DatabaseError::from)?;
            return Ok(None);
        };
        let out = match f(&mut user) {
            Ok(out) => out,
            Err(e) => {
                write_txn.abort().map_err(DatabaseError::from)?;
                return Err(e);
            }
        };
        db::store_doc(&write_txn, USERS, id, &user)?;
        write_txn.commit().map_err(DatabaseError::from)?;
        Ok(Some((user, out)))
    }

    /// Delete a user and its email index entry.
    pub fn delete_user(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = match db::load_doc::<User>(&write_txn, USERS, id)? {
            Some(user) => {
                db::remove_doc(&write_txn, USERS, id)?;
                db::key_remove(&write_txn, USER_EMAILS, &user.email.to_lowercase())?;
                true
            }
            None => false,
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}
