use serde::Serialize;

use crate::file_store::{FileStore, StoredObject, Upload};

/// Per-file result of a batch upload.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub nombre: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn failed(nombre: impl Into<String>, error: impl Into<String>) -> Self {
        FileOutcome {
            nombre: nombre.into(),
            success: false,
            url: None,
            error: Some(error.into()),
        }
    }

    fn stored(nombre: &str, object: &StoredObject) -> Self {
        FileOutcome {
            nombre: nombre.to_string(),
            success: true,
            url: Some(object.url.clone()),
            error: None,
        }
    }
}

/// How a batch went overall; decides between 201, 207 and 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    AllSucceeded,
    Partial,
    AllFailed,
}

pub fn batch_status(outcomes: &[FileOutcome]) -> BatchStatus {
    let failed = outcomes.iter().filter(|o| !o.success).count();
    match failed {
        0 => BatchStatus::AllSucceeded,
        n if n == outcomes.len() => BatchStatus::AllFailed,
        _ => BatchStatus::Partial,
    }
}

/// Save each file independently. One failure does not stop the others.
pub async fn store_each(
    store: &dyn FileStore,
    files: Vec<Upload>,
    location_hint: Option<&str>,
) -> (Vec<(Upload, StoredObject)>, Vec<FileOutcome>) {
    let mut stored = Vec::new();
    let mut outcomes = Vec::new();
    for upload in files {
        match store.save(&upload, location_hint).await {
            Ok(object) => {
                outcomes.push(FileOutcome::stored(&upload.original_name, &object));
                stored.push((upload, object));
            }
            Err(e) => {
                tracing::warn!(file = %upload.original_name, error = %e, "Failed to store upload");
                outcomes.push(FileOutcome::failed(&upload.original_name, e.to_string()));
            }
        }
    }
    (stored, outcomes)
}

/// Best-effort removal; failures are logged and otherwise ignored.
pub async fn discard(store: &dyn FileStore, keys: Vec<String>) {
    for key in keys {
        if let Err(e) = store.delete(&key).await {
            tracing::warn!(key = %key, error = %e, "Failed to delete stored file");
        }
    }
}
