use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::multipart::UploadForm;
use crate::api::response::{self, ApiError, AppJson, AppQuery, JSend};
use crate::auth::CurrentUser;
use crate::services::library::{self, FileMetadataPatch, ListQuery, Listing};
use crate::services::uploads::FileOutcome;
use crate::storage::models::{Archivo, Folder};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub nombre: Option<String>,
    /// Parent folder id; absent or `"0"` is the root
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub autor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub archivos: Vec<Archivo>,
    pub resultados: Vec<FileOutcome>,
}

#[derive(Debug, Serialize)]
pub struct DeleteFolderResponse {
    pub files_deleted: usize,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Path(folder_id): Path<String>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<JSend<Listing>>, ApiError> {
    let listing = library::list(&state, &folder_id, &query, viewer.as_ref().map(|v| &v.0))?;
    Ok(JSend::success(listing))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<Json<JSend<Vec<Archivo>>>, ApiError> {
    let files = library::search(
        &state,
        &params.q,
        params.tipo.as_deref(),
        params.autor.as_deref(),
        viewer.as_ref().map(|v| &v.0),
    )?;
    Ok(JSend::success(files))
}

pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<JSend<Folder>>), ApiError> {
    let folder = library::create_folder(&state, req.nombre.as_deref(), req.parent.as_deref(), &user)?;
    Ok(response::created(folder))
}

pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<DeleteFolderResponse>>, ApiError> {
    let files_deleted = library::delete_folder(&state, &id).await?;
    Ok(JSend::success(DeleteFolderResponse { files_deleted }))
}

/// Multipart upload: one or more `archivos` parts plus an optional `folder` field.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JSend<UploadResponse>>), ApiError> {
    let form = UploadForm::read(multipart, state.config.max_upload_size).await?;
    let folder = form.field("folder").map(str::to_string);

    let (archivos, resultados) =
        library::upload_files(&state, form.files, folder.as_deref(), &user, form.rejected).await?;

    let created_any = !archivos.is_empty();
    let results = resultados.clone();
    response::batch(UploadResponse { archivos, resultados }, &results, created_any)
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Archivo>>, ApiError> {
    Ok(JSend::success(library::get_file(&state, &id, viewer.as_ref().map(|v| &v.0))?))
}

pub async fn update_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(patch): AppJson<FileMetadataPatch>,
) -> Result<Json<JSend<Archivo>>, ApiError> {
    Ok(JSend::success(library::update_file_metadata(&state, &id, patch, &user)?))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    library::delete_file(&state, &id, &user).await?;
    Ok(JSend::success(()))
}
