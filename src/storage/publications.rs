use super::db::{self, Database, DatabaseError};
use super::models::{Publication, PublicationStatus, PublicationTag};
use super::tables::*;

/// Filters for listing publications. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct PublicationFilter<'a> {
    pub tag: Option<PublicationTag>,
    pub categoria: Option<&'a str>,
    pub published: Option<bool>,
    pub autor: Option<&'a str>,
}

impl PublicationFilter<'_> {
    fn matches(&self, publication: &Publication) -> bool {
        self.tag.map_or(true, |tag| publication.tag == tag)
            && self.categoria.map_or(true, |c| publication.categoria == c)
            && self
                .published
                .map_or(true, |p| publication.status.is_published() == p)
            && self.autor.map_or(true, |a| publication.autor == a)
    }
}

impl Database {
    // ========================================================================
    // Publication operations
    // ========================================================================

    /// Store a publication and register it in the author index
    pub fn put_publication(&self, publication: &Publication) -> Result<(), DatabaseError> {
        debug_assert!(!publication.id.is_empty(), "publication id must not be empty");

        let write_txn = self.begin_write()?;
        db::store_doc(&write_txn, PUBLICATIONS, &publication.id, publication)?;
        db::index_add(&write_txn, AUTHOR_PUBLICATIONS, &publication.autor, &publication.id)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_publication(&self, id: &str) -> Result<Option<Publication>, DatabaseError> {
        self.get_doc(PUBLICATIONS, id)
    }

    /// Delete a publication and clean up the author index. Returns the removed document.
    pub fn delete_publication(&self, id: &str) -> Result<Option<Publication>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = db::load_doc::<Publication>(&write_txn, PUBLICATIONS, id)?;
        if let Some(ref publication) = removed {
            db::remove_doc(&write_txn, PUBLICATIONS, id)?;
            db::index_remove(&write_txn, AUTHOR_PUBLICATIONS, &publication.autor, id)?;
        }
        write_txn.commit()?;
        Ok(removed)
    }

    /// Atomically modify a publication. `Ok(None)` when it does not exist;
    /// an error from `f` aborts the transaction and nothing is written.
    pub fn modify_publication<T, E, F>(&self, id: &str, f: F) -> Result<Option<(Publication, T)>, E>
    where
        E: From<DatabaseError>,
        F: FnOnce(&mut Publication) -> Result<T, E>,
    {
        let write_txn = self.begin_write()?;
        let Some(mut publication) = db::load_doc::<Publication>(&write_txn, PUBLICATIONS, id)? else {
            write_txn.abort().map_err(DatabaseError::from)?;
            return Ok(None);
        };
        let out = match f(&mut publication) {
            Ok(out) => out,
            Err(e) => {
                write_txn.abort().map_err(DatabaseError::from)?;
                return Err(e);
            }
        };
        debug_assert_eq!(
            publication.pending_update.is_some(),
            publication.status == PublicationStatus::PendingEdit,
            "pending_update must be present exactly in PendingEdit"
        );
        db::store_doc(&write_txn, PUBLICATIONS, id, &publication)?;
        write_txn.commit().map_err(DatabaseError::from)?;
        Ok(Some((publication, out)))
    }

    /// All publications matching the filter, newest first.
    pub fn list_publications(
        &self,
        filter: &PublicationFilter<'_>,
    ) -> Result<Vec<Publication>, DatabaseError> {
        let all = match filter.autor {
            Some(autor) => self.get_publications_by_author(autor)?,
            None => self.all_docs(PUBLICATIONS)?,
        };
        let mut publications: Vec<Publication> =
            all.into_iter().filter(|p| filter.matches(p)).collect();
        publications.sort_by(|a, b| b.fecha.cmp(&a.fecha));
        Ok(publications)
    }

    /// Get all publications of an author, any status
    pub fn get_publications_by_author(&self, autor: &str) -> Result<Vec<Publication>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(AUTHOR_PUBLICATIONS)?;
        let publications = read_txn.open_table(PUBLICATIONS)?;

        let ids: Vec<String> = match index.get(autor)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut result = Vec::new();
        for id in ids {
            if let Some(data) = publications.get(id.as_str())? {
                result.push(rmp_serde::from_slice(data.value())?);
            }
        }
        Ok(result)
    }

    /// Number of publications owned by an author, regardless of status.
    pub fn count_publications_by_author(&self, autor: &str) -> Result<usize, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(AUTHOR_PUBLICATIONS)?;
        let count = match index.get(autor)? {
            Some(data) => rmp_serde::from_slice::<Vec<String>>(data.value())?.len(),
            None => 0,
        };
        Ok(count)
    }
}
