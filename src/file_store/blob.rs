use async_trait::async_trait;
use chrono::Utc;

use super::{FileStore, FileStoreError, StoredContent, StoredObject, Upload};
use crate::storage::models::BlobMeta;
use crate::storage::Database;

/// Blob store inside the redb database, for publication attachments.
/// Keys are UUIDs; URLs are `<public_base>/<uuid>`.
pub struct BlobFileStore {
    db: Database,
    public_base: String,
}

impl BlobFileStore {
    pub fn new(db: Database, public_base: impl Into<String>) -> Self {
        Self {
            db,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }
}

fn parse_key(key: &str) -> Result<String, FileStoreError> {
    uuid::Uuid::parse_str(key)
        .map(|id| id.to_string())
        .map_err(|_| FileStoreError::InvalidKey(key.to_string()))
}

fn backend(e: crate::storage::DatabaseError) -> FileStoreError {
    FileStoreError::Backend(e.to_string())
}

fn joined(e: tokio::task::JoinError) -> FileStoreError {
    FileStoreError::Backend(e.to_string())
}

#[async_trait]
impl FileStore for BlobFileStore {
    async fn save(
        &self,
        upload: &Upload,
        _location_hint: Option<&str>,
    ) -> Result<StoredObject, FileStoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let meta = BlobMeta {
            id: id.clone(),
            filename: upload.original_name.clone(),
            mime_type: upload.mime_type.clone(),
            size: upload.size(),
            uploaded_at: Utc::now(),
        };

        let db = self.db.clone();
        let data = upload.data.clone();
        tokio::task::spawn_blocking(move || db.put_blob(&meta, &data))
            .await
            .map_err(joined)?
            .map_err(backend)?;

        Ok(StoredObject {
            url: format!("{}/{}", self.public_base, id),
            key: id,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), FileStoreError> {
        let id = parse_key(key)?;
        let db = self.db.clone();
        let blob_id = id.clone();
        let removed = tokio::task::spawn_blocking(move || db.delete_blob(&blob_id))
            .await
            .map_err(joined)?
            .map_err(backend)?;

        if removed {
            Ok(())
        } else {
            Err(FileStoreError::NotFound(id))
        }
    }

    async fn open(&self, key: &str) -> Result<StoredContent, FileStoreError> {
        let id = parse_key(key)?;
        let db = self.db.clone();
        let blob_id = id.clone();
        let (meta, data) = tokio::task::spawn_blocking(move || db.get_blob(&blob_id))
            .await
            .map_err(joined)?
            .map_err(backend)?
            .ok_or(FileStoreError::NotFound(id))?;

        Ok(StoredContent {
            mime_type: meta.mime_type,
            size: data.len() as u64,
            reader: Box::pin(std::io::Cursor::new(data)),
        })
    }
}
