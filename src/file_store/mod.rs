mod blob;
mod local;

pub use blob::BlobFileStore;
pub use local::{resolve_within, sanitize_filename, LocalFileStore};

use async_trait::async_trait;
use bytes::Bytes;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
    #[error("Path escapes storage root: {0}")]
    Forbidden(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// An uploaded file, already read out of the request body.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl Upload {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Where a saved file ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// Public URL the file is served from
    pub url: String,
    /// Key to pass back to `delete`/`open`
    pub key: String,
}

/// Readable content of a stored file.
pub struct StoredContent {
    pub mime_type: String,
    pub size: u64,
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
}

/// Abstraction over the two upload backends.
/// Library documents live on the local filesystem; publication attachments
/// live as blobs inside the database.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist an upload. `location_hint` groups files (e.g. a folder id).
    async fn save(
        &self,
        upload: &Upload,
        location_hint: Option<&str>,
    ) -> Result<StoredObject, FileStoreError>;
    async fn delete(&self, key: &str) -> Result<(), FileStoreError>;
    async fn open(&self, key: &str) -> Result<StoredContent, FileStoreError>;
}
