use async_trait::async_trait;
use chrono::Utc;
use std::path::{Component, Path, PathBuf};

use super::{FileStore, FileStoreError, StoredContent, StoredObject, Upload};

/// Local filesystem store for library documents.
/// Keys are paths relative to the root: `<folder-or-root>/<unique-name>`.
pub struct LocalFileStore {
    base_path: PathBuf,
    /// Public URL prefix, e.g. `https://komuness.cl/api/biblioteca/files`
    public_base: String,
}

impl LocalFileStore {
    pub fn new<P: AsRef<Path>>(base_path: P, public_base: impl Into<String>) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, FileStoreError> {
        resolve_within(&self.base_path, key).ok_or_else(|| FileStoreError::Forbidden(key.to_string()))
    }
}

/// Resolve `key` below `root` without letting it climb out.
/// Returns `None` for absolute keys or keys whose `..` segments escape the root.
pub fn resolve_within(root: &Path, key: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if relative.as_os_str().is_empty() {
        return None;
    }

    let resolved = root.join(&relative);

    // Symlinks inside the tree must not point outside of it either.
    if let (Ok(real_root), Ok(real_path)) = (root.canonicalize(), resolved.canonicalize()) {
        if !real_path.starts_with(&real_root) {
            return None;
        }
    }
    Some(resolved)
}

/// Reduce an uploaded filename to a safe single path segment.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "archivo".to_string()
    } else {
        cleaned
    }
}

fn sanitize_segment(hint: Option<&str>) -> String {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(h) => sanitize_filename(h),
        None => "root".to_string(),
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(
        &self,
        upload: &Upload,
        location_hint: Option<&str>,
    ) -> Result<StoredObject, FileStoreError> {
        let dir = sanitize_segment(location_hint);
        let unique = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &uuid::Uuid::new_v4().simple().to_string()[..8],
            sanitize_filename(&upload.original_name)
        );
        let key = format!("{dir}/{unique}");

        let dir_path = self.base_path.join(&dir);
        tokio::fs::create_dir_all(&dir_path).await?;
        tokio::fs::write(dir_path.join(&unique), &upload.data).await?;

        Ok(StoredObject {
            url: format!("{}/{}", self.public_base, key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), FileStoreError> {
        let path = self.object_path(key)?;
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn open(&self, key: &str) -> Result<StoredContent, FileStoreError> {
        let path = self.object_path(key)?;
        if !path.is_file() {
            return Err(FileStoreError::NotFound(key.to_string()));
        }
        let file = tokio::fs::File::open(&path).await?;
        let size = file.metadata().await?.len();
        let mime_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();

        Ok(StoredContent {
            mime_type,
            size,
            reader: Box::pin(file),
        })
    }
}
