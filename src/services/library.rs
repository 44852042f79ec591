//! Shared document library: nested folders and files on the local store.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::input::{self, nullable};
use super::uploads::{self, FileOutcome};
use super::{ServiceError, ServiceResult};
use crate::file_store::Upload;
use crate::storage::models::{Archivo, FileType, Folder, User};
use crate::AppState;

/// Folder id clients use for the library root.
pub const ROOT_FOLDER: &str = "0";

const MAX_NAME: usize = 255;
const MAX_DESCRIPTION: usize = 2_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub nombre: Option<String>,
    /// Search the whole tree instead of one folder
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub publico: Option<bool>,
    #[serde(default)]
    pub orden: SortOrder,
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub folders: Vec<Folder>,
    pub files: Vec<Archivo>,
}

/// Editable file metadata. `folder: null` (or `"0"`) moves to the root.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileMetadataPatch {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub descripcion: Option<Option<String>>,
    #[serde(default)]
    pub publico: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub folder: Option<Option<String>>,
}

fn folder_scope(id: Option<&str>) -> Option<&str> {
    id.map(str::trim)
        .filter(|id| !id.is_empty() && *id != ROOT_FOLDER)
}

/// Map a client folder id to a stored parent reference, checking it exists.
fn existing_folder(state: &AppState, id: Option<&str>) -> ServiceResult<Option<String>> {
    match folder_scope(id) {
        None => Ok(None),
        Some(id) => state
            .db
            .get_folder(id)?
            .map(|f| Some(f.id))
            .ok_or_else(|| ServiceError::not_found("Folder not found")),
    }
}

fn can_see(file: &Archivo, viewer: Option<&User>) -> bool {
    file.publico || viewer.is_some_and(|v| v.tier.is_admin() || v.id == file.autor)
}

fn can_manage(file: &Archivo, caller: &User) -> bool {
    caller.tier.is_admin() || caller.id == file.autor
}

fn sort_by_name<T>(items: &mut [T], order: SortOrder, name: impl Fn(&T) -> &str) {
    items.sort_by_cached_key(|item| input::fold(name(item)));
    if order == SortOrder::Desc {
        items.reverse();
    }
}

pub fn list(
    state: &AppState,
    folder_id: &str,
    query: &ListQuery,
    viewer: Option<&User>,
) -> ServiceResult<Listing> {
    let scope = if query.global {
        None
    } else {
        existing_folder(state, Some(folder_id))?
    };
    let needle = query
        .nombre
        .as_deref()
        .map(|n| input::fold(n.trim()))
        .filter(|n| !n.is_empty());
    let name_matches = |nombre: &str| needle.as_ref().map_or(true, |n| input::fold(nombre).contains(n));

    let folders = if query.global {
        state.db.all_folders()?
    } else {
        state.db.child_folders(scope.as_deref())?
    };
    let mut folders: Vec<Folder> = folders.into_iter().filter(|f| name_matches(&f.nombre)).collect();

    let files = if query.global {
        state.db.all_files()?
    } else {
        state.db.files_in_folder(scope.as_deref())?
    };
    let mut files: Vec<Archivo> = files
        .into_iter()
        .filter(|a| can_see(a, viewer))
        .filter(|a| query.publico.map_or(true, |p| a.publico == p))
        .filter(|a| name_matches(&a.nombre))
        .collect();

    sort_by_name(&mut folders, query.orden, |f| &f.nombre);
    sort_by_name(&mut files, query.orden, |a| &a.nombre);

    Ok(Listing { folders, files })
}

pub fn create_folder(
    state: &AppState,
    nombre: Option<&str>,
    parent: Option<&str>,
    author: &User,
) -> ServiceResult<Folder> {
    let nombre = input::required_text("nombre", nombre, MAX_NAME)?;
    let parent = existing_folder(state, parent)?;

    let folder = Folder {
        id: uuid::Uuid::new_v4().to_string(),
        nombre,
        parent,
        autor: author.id.clone(),
        created_at: Utc::now(),
    };
    state.db.put_folder(&folder)?;

    tracing::info!(folder_id = %folder.id, parent = ?folder.parent, "Folder created");
    Ok(folder)
}

/// Delete a folder with every subfolder and file below it. Returns how many
/// files were removed.
pub async fn delete_folder(state: &AppState, id: &str) -> ServiceResult<usize> {
    let removed = state
        .db
        .delete_folder_tree(id)?
        .ok_or_else(|| ServiceError::not_found("Folder not found"))?;

    let count = removed.len();
    let keys: Vec<String> = removed.into_iter().map(|a| a.key).collect();
    uploads::discard(state.library.as_ref(), keys).await;

    tracing::info!(folder_id = %id, files = count, "Folder deleted");
    Ok(count)
}

/// Store each file and create its record. Failures are reported per file.
pub async fn upload_files(
    state: &AppState,
    files: Vec<Upload>,
    folder: Option<&str>,
    author: &User,
    mut rejected: Vec<FileOutcome>,
) -> ServiceResult<(Vec<Archivo>, Vec<FileOutcome>)> {
    let folder = existing_folder(state, folder)?;
    if files.is_empty() && rejected.is_empty() {
        return Err(ServiceError::validation("no files were uploaded"));
    }

    let hint = folder.as_deref();
    let (stored, mut outcomes) = uploads::store_each(state.library.as_ref(), files, hint).await;

    let now = Utc::now();
    let mut records: Vec<Archivo> = Vec::with_capacity(stored.len());
    for (upload, object) in stored {
        let record = Archivo {
            id: uuid::Uuid::new_v4().to_string(),
            nombre: upload.original_name.clone(),
            descripcion: None,
            autor: author.id.clone(),
            size: upload.size(),
            mime_type: upload.mime_type.clone(),
            tipo: FileType::from_mime(&upload.mime_type),
            url: object.url,
            key: object.key,
            publico: true,
            folder: folder.clone(),
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = state.db.put_file(&record) {
            let mut keys: Vec<String> = records.iter().map(|r| r.key.clone()).collect();
            keys.push(record.key);
            uploads::discard(state.library.as_ref(), keys).await;
            return Err(e.into());
        }
        records.push(record);
    }
    outcomes.append(&mut rejected);

    tracing::info!(
        folder = ?folder,
        stored = records.len(),
        failed = outcomes.iter().filter(|o| !o.success).count(),
        "Library upload processed"
    );
    Ok((records, outcomes))
}

pub fn get_file(state: &AppState, id: &str, viewer: Option<&User>) -> ServiceResult<Archivo> {
    state
        .db
        .get_file(id)?
        .filter(|a| can_see(a, viewer))
        .ok_or_else(|| ServiceError::not_found("File not found"))
}

/// The record behind a stored library object, if the viewer may read it.
pub fn visible_by_key(state: &AppState, key: &str, viewer: Option<&User>) -> ServiceResult<Archivo> {
    state
        .db
        .get_file_by_key(key)?
        .filter(|a| can_see(a, viewer))
        .ok_or_else(|| ServiceError::not_found("File not found"))
}

pub fn update_file_metadata(
    state: &AppState,
    id: &str,
    patch: FileMetadataPatch,
    caller: &User,
) -> ServiceResult<Archivo> {
    let nombre = patch
        .nombre
        .as_deref()
        .map(|n| input::required_text("nombre", Some(n), MAX_NAME))
        .transpose()?;
    let descripcion = match patch.descripcion {
        Some(Some(d)) if !d.trim().is_empty() => {
            Some(Some(input::required_text("descripcion", Some(&d), MAX_DESCRIPTION)?))
        }
        Some(_) => Some(None),
        None => None,
    };
    let folder = match patch.folder {
        Some(target) => Some(existing_folder(state, target.as_deref())?),
        None => None,
    };

    let (file, ()) = state
        .db
        .modify_file(id, |file| -> ServiceResult<()> {
            if !can_manage(file, caller) {
                return Err(ServiceError::forbidden("Only the owner or an admin can edit this file"));
            }
            if let Some(nombre) = nombre {
                file.nombre = nombre;
            }
            if let Some(descripcion) = descripcion {
                file.descripcion = descripcion;
            }
            if let Some(publico) = patch.publico {
                file.publico = publico;
            }
            if let Some(folder) = folder {
                file.folder = folder;
            }
            Ok(())
        })?
        .ok_or_else(|| ServiceError::not_found("File not found"))?;

    tracing::info!(file_id = %id, "File metadata updated");
    Ok(file)
}

pub async fn delete_file(state: &AppState, id: &str, caller: &User) -> ServiceResult<Archivo> {
    let file = state
        .db
        .get_file(id)?
        .ok_or_else(|| ServiceError::not_found("File not found"))?;
    if !can_manage(&file, caller) {
        return Err(ServiceError::forbidden("Only the owner or an admin can delete this file"));
    }

    let removed = state
        .db
        .delete_file(id)?
        .ok_or_else(|| ServiceError::not_found("File not found"))?;
    uploads::discard(state.library.as_ref(), vec![removed.key.clone()]).await;

    tracing::info!(file_id = %id, "File deleted");
    Ok(removed)
}

/// Search file names and descriptions across the whole library. `tipo` matches
/// either the file type (`image`, `document`, ...) or a MIME prefix.
pub fn search(
    state: &AppState,
    text: &str,
    tipo: Option<&str>,
    autor: Option<&str>,
    viewer: Option<&User>,
) -> ServiceResult<Vec<Archivo>> {
    let needle = input::fold(text.trim());
    let tipo = tipo.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty());

    let mut files: Vec<Archivo> = state
        .db
        .all_files()?
        .into_iter()
        .filter(|a| can_see(a, viewer))
        .filter(|a| autor.map_or(true, |autor| a.autor == autor))
        .filter(|a| {
            tipo.as_deref().map_or(true, |t| {
                a.tipo.as_str() == t || a.mime_type.to_lowercase().starts_with(t)
            })
        })
        .filter(|a| {
            needle.is_empty()
                || input::fold(&a.nombre).contains(&needle)
                || a
                    .descripcion
                    .as_deref()
                    .is_some_and(|d| input::fold(d).contains(&needle))
        })
        .collect();

    sort_by_name(&mut files, SortOrder::Asc, |a| &a.nombre);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::Tier;
    use crate::testutil;

    #[tokio::test]
    async fn test_delete_folder_cascades() {
        let dir = tempfile::tempdir().unwrap();
        let state = testutil::test_state(&dir);
        let user = testutil::make_user(&state, "lib@example.com", Tier::Basic);

        let top = create_folder(&state, Some("Actas"), None, &user).unwrap();
        let nested = create_folder(&state, Some("2024"), Some(&top.id), &user).unwrap();
        let other = create_folder(&state, Some("Otros"), Some(ROOT_FOLDER), &user).unwrap();

        let (in_top, _) = upload_files(
            &state,
            vec![testutil::upload("acta.pdf", b"%PDF")],
            Some(&top.id),
            &user,
            Vec::new(),
        )
        .await
        .unwrap();
        upload_files(
            &state,
            vec![testutil::upload("enero.pdf", b"%PDF"), testutil::upload("feb.pdf", b"%PDF")],
            Some(&nested.id),
            &user,
            Vec::new(),
        )
        .await
        .unwrap();
        let (kept, _) = upload_files(
            &state,
            vec![testutil::upload("nota.txt", b"hola")],
            Some(&other.id),
            &user,
            Vec::new(),
        )
        .await
        .unwrap();

        assert_eq!(delete_folder(&state, &top.id).await.unwrap(), 3);

        assert!(state.db.get_folder(&nested.id).unwrap().is_none());
        let remaining = state.db.all_files().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, kept[0].id);
        assert!(state.library.open(&in_top[0].key).await.is_err());
        assert!(state.library.open(&kept[0].key).await.is_ok());

        assert!(matches!(
            delete_folder(&state, &top.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_visibility_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let state = testutil::test_state(&dir);
        let owner = testutil::make_user(&state, "owner@example.com", Tier::Basic);
        let stranger = testutil::make_user(&state, "stranger@example.com", Tier::Basic);
        let admin = testutil::make_user(&state, "admin@example.com", Tier::Admin);

        let (files, _) = upload_files(
            &state,
            vec![
                testutil::upload("zeta.pdf", b"z"),
                testutil::upload("Árbol.pdf", b"a"),
                testutil::upload("privado.pdf", b"p"),
            ],
            None,
            &owner,
            Vec::new(),
        )
        .await
        .unwrap();
        let private = files.iter().find(|f| f.nombre == "privado.pdf").unwrap();
        update_file_metadata(
            &state,
            &private.id,
            FileMetadataPatch {
                publico: Some(false),
                ..Default::default()
            },
            &owner,
        )
        .unwrap();

        let query = ListQuery::default();
        let names = |listing: Listing| listing.files.into_iter().map(|f| f.nombre).collect::<Vec<_>>();

        assert_eq!(
            names(list(&state, ROOT_FOLDER, &query, Some(&stranger)).unwrap()),
            vec!["Árbol.pdf", "zeta.pdf"]
        );
        assert_eq!(names(list(&state, ROOT_FOLDER, &query, None).unwrap()).len(), 2);
        assert_eq!(names(list(&state, ROOT_FOLDER, &query, Some(&owner)).unwrap()).len(), 3);

        let desc = ListQuery {
            orden: SortOrder::Desc,
            ..Default::default()
        };
        assert_eq!(
            names(list(&state, ROOT_FOLDER, &desc, Some(&admin)).unwrap()),
            vec!["zeta.pdf", "privado.pdf", "Árbol.pdf"]
        );

        assert!(matches!(
            list(&state, "no-such-folder", &query, None),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_visible_by_key_follows_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = testutil::test_state(&dir);
        let owner = testutil::make_user(&state, "k@example.com", Tier::Basic);
        let stranger = testutil::make_user(&state, "ks@example.com", Tier::Basic);

        let (files, _) = upload_files(
            &state,
            vec![testutil::upload("acta.txt", b"secreto")],
            None,
            &owner,
            Vec::new(),
        )
        .await
        .unwrap();
        let file = &files[0];
        assert_eq!(visible_by_key(&state, &file.key, None).unwrap().id, file.id);

        update_file_metadata(
            &state,
            &file.id,
            FileMetadataPatch {
                publico: Some(false),
                ..Default::default()
            },
            &owner,
        )
        .unwrap();
        assert!(matches!(
            visible_by_key(&state, &file.key, None),
            Err(ServiceError::NotFound(_))
        ));
        assert!(visible_by_key(&state, &file.key, Some(&stranger)).is_err());
        assert!(visible_by_key(&state, &file.key, Some(&owner)).is_ok());

        delete_file(&state, &file.id, &owner).await.unwrap();
        assert!(visible_by_key(&state, &file.key, Some(&owner)).is_err());
    }

    #[tokio::test]
    async fn test_global_name_filter() {
        let dir = tempfile::tempdir().unwrap();
        let state = testutil::test_state(&dir);
        let user = testutil::make_user(&state, "g@example.com", Tier::Basic);

        let folder = create_folder(&state, Some("Reglamentos"), None, &user).unwrap();
        upload_files(
            &state,
            vec![testutil::upload("Reglamento interno.pdf", b"r")],
            Some(&folder.id),
            &user,
            Vec::new(),
        )
        .await
        .unwrap();

        let query = ListQuery {
            nombre: Some("reglamento".to_string()),
            global: true,
            ..Default::default()
        };
        let listing = list(&state, ROOT_FOLDER, &query, None).unwrap();
        assert_eq!(listing.folders.len(), 1);
        assert_eq!(listing.files.len(), 1);

        let scoped = ListQuery {
            global: false,
            ..query
        };
        assert!(list(&state, ROOT_FOLDER, &scoped, None).unwrap().files.is_empty());
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_manage_files() {
        let dir = tempfile::tempdir().unwrap();
        let state = testutil::test_state(&dir);
        let owner = testutil::make_user(&state, "o@example.com", Tier::Basic);
        let other = testutil::make_user(&state, "x@example.com", Tier::Premium);

        let (files, _) = upload_files(
            &state,
            vec![testutil::upload("doc.pdf", b"d")],
            None,
            &owner,
            Vec::new(),
        )
        .await
        .unwrap();
        let id = &files[0].id;

        let patch = FileMetadataPatch {
            nombre: Some("robado.pdf".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_file_metadata(&state, id, patch, &other),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            delete_file(&state, id, &other).await,
            Err(ServiceError::Forbidden(_))
        ));

        delete_file(&state, id, &owner).await.unwrap();
        assert!(state.db.get_file(id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_by_type() {
        let dir = tempfile::tempdir().unwrap();
        let state = testutil::test_state(&dir);
        let user = testutil::make_user(&state, "s@example.com", Tier::Basic);

        upload_files(
            &state,
            vec![
                testutil::upload("foto.png", b"png"),
                testutil::upload("informe.pdf", b"pdf"),
            ],
            None,
            &user,
            Vec::new(),
        )
        .await
        .unwrap();

        let images = search(&state, "", Some("image"), None, None).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].nombre, "foto.png");

        let pdfs = search(&state, "INFORME", Some("application/pdf"), Some(&user.id), None).unwrap();
        assert_eq!(pdfs.len(), 1);
    }
}
