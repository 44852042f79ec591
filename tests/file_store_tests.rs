use bytes::Bytes;
use tokio::io::AsyncReadExt;

use komuness::file_store::{BlobFileStore, FileStore, FileStoreError, LocalFileStore, Upload};
use komuness::storage::Database;

fn upload(name: &str, mime_type: &str, data: &'static [u8]) -> Upload {
    Upload {
        original_name: name.to_string(),
        mime_type: mime_type.to_string(),
        data: Bytes::from_static(data),
    }
}

async fn read_all(store: &dyn FileStore, key: &str) -> (String, Vec<u8>) {
    let mut content = store.open(key).await.unwrap();
    let mut buf = Vec::new();
    content.reader.read_to_end(&mut buf).await.unwrap();
    assert_eq!(content.size, buf.len() as u64);
    (content.mime_type, buf)
}

#[tokio::test]
async fn test_local_store_save_open_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::new(dir.path(), "/api/biblioteca/files/").unwrap();

    let stored = store
        .save(&upload("Informe anual.pdf", "application/pdf", b"%PDF-1.7"), Some("folder-1"))
        .await
        .unwrap();
    assert!(stored.key.starts_with("folder-1/"));
    assert!(stored.key.ends_with("-Informe_anual.pdf"));
    assert_eq!(stored.url, format!("/api/biblioteca/files/{}", stored.key));

    let (mime_type, data) = read_all(&store, &stored.key).await;
    assert_eq!(mime_type, "application/pdf");
    assert_eq!(data, b"%PDF-1.7");

    store.delete(&stored.key).await.unwrap();
    assert!(matches!(
        store.open(&stored.key).await,
        Err(FileStoreError::NotFound(_))
    ));
    // Deleting twice is not an error
    store.delete(&stored.key).await.unwrap();
}

#[tokio::test]
async fn test_local_store_without_hint_uses_root() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::new(dir.path(), "/files").unwrap();

    let stored = store
        .save(&upload("nota.txt", "text/plain", b"hola"), None)
        .await
        .unwrap();
    assert!(stored.key.starts_with("root/"));
}

#[tokio::test]
async fn test_local_store_refuses_escaping_keys() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("biblioteca");
    let store = LocalFileStore::new(&root, "/files").unwrap();
    std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

    for key in ["../secret.txt", "root/../../secret.txt", "/etc/passwd"] {
        assert!(
            matches!(store.open(key).await, Err(FileStoreError::Forbidden(_))),
            "{key} should be refused"
        );
        assert!(matches!(
            store.delete(key).await,
            Err(FileStoreError::Forbidden(_))
        ));
    }
    assert!(dir.path().join("secret.txt").exists());
}

#[tokio::test]
async fn test_blob_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let store = BlobFileStore::new(db.clone(), "/api/files");

    let stored = store
        .save(&upload("foto.png", "image/png", b"\x89PNG"), Some("ignored"))
        .await
        .unwrap();
    assert_eq!(stored.url, format!("/api/files/{}", stored.key));

    let (mime_type, data) = read_all(&store, &stored.key).await;
    assert_eq!(mime_type, "image/png");
    assert_eq!(data, b"\x89PNG");
    assert!(db.get_blob(&stored.key).unwrap().is_some());

    store.delete(&stored.key).await.unwrap();
    assert!(matches!(
        store.open(&stored.key).await,
        Err(FileStoreError::NotFound(_))
    ));
    assert!(matches!(
        store.delete(&stored.key).await,
        Err(FileStoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_blob_store_rejects_malformed_keys() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let store = BlobFileStore::new(db, "/api/files");

    assert!(matches!(
        store.open("not-a-uuid").await,
        Err(FileStoreError::InvalidKey(_))
    ));
}
