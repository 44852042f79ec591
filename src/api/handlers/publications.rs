use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::multipart::UploadForm;
use crate::api::response::{
    self, ApiError, AppJson, AppQuery, JSend, JSendPaginated, Pagination,
};
use crate::auth::CurrentUser;
use crate::services::publications::{self, ListQuery, PublicationInput};
use crate::services::uploads::FileOutcome;
use crate::services::input;
use crate::storage::models::{Comment, Publication, PublicationTag};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub publicacion: Publication,
    pub archivos: Vec<FileOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub categoria: Option<String>,
    /// Admins only; everyone else sees published documents
    #[serde(default)]
    pub publicado: Option<bool>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub autor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarParams {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub texto: String,
}

fn parse_tag(tag: Option<&str>) -> Result<Option<PublicationTag>, ApiError> {
    match tag.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.parse().map(Some).map_err(ApiError::bad_request),
        None => Ok(None),
    }
}

/// Build a submission from multipart text fields.
fn input_from_form(form: &UploadForm) -> Result<PublicationInput, ApiError> {
    let optional = |name: &str| form.field(name).map(str::to_string);
    let nullable = |name: &str| {
        form.field(name)
            .map(|v| Some(v.to_string()).filter(|v| !v.trim().is_empty()))
    };

    Ok(PublicationInput {
        titulo: optional("titulo"),
        descripcion: optional("descripcion"),
        tag: optional("tag"),
        categoria: optional("categoria"),
        fecha_evento: nullable("fechaEvento"),
        hora_evento: nullable("horaEvento"),
        precio: nullable("precio").map(|p| p.map(serde_json::Value::String)),
        enlaces_externos: form.json_field("enlacesExternos")?,
        adjuntos: None,
    })
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_publication(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    AppJson(form): AppJson<PublicationInput>,
) -> Result<(StatusCode, Json<JSend<SubmitResponse>>), ApiError> {
    let outcome = publications::submit(&state, &user, form, Vec::new(), Vec::new()).await?;
    Ok(response::created(SubmitResponse {
        publicacion: outcome.publication,
        archivos: outcome.uploads,
    }))
}

/// Multipart submission with attachments in `archivos` parts.
pub async fn create_publication_multipart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JSend<SubmitResponse>>), ApiError> {
    let form = UploadForm::read(multipart, state.config.max_upload_size).await?;
    let submission = input_from_form(&form)?;

    let outcome = publications::submit(&state, &user, submission, form.files, form.rejected).await?;
    let results = outcome.uploads.clone();
    response::batch(
        SubmitResponse {
            publicacion: outcome.publication,
            archivos: outcome.uploads,
        },
        &results,
        true,
    )
}

pub async fn list_publications(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<JSendPaginated<Publication>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }
    let is_admin = viewer.as_ref().is_some_and(|v| v.0.tier.is_admin());

    let page = publications::list_by_tag(
        &state,
        &ListQuery {
            tag: parse_tag(params.tag.as_deref())?,
            page: params.page,
            page_size: params.limit,
            categoria: params.categoria,
            publicado: if is_admin { params.publicado } else { Some(true) },
        },
    )?;

    Ok(JSendPaginated::success(
        page.items,
        Pagination {
            limit: page.limit,
            offset: page.offset,
            total: page.total,
        },
    ))
}

pub async fn get_publication(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Publication>>, ApiError> {
    let publication = publications::get_by_id(&state, &id, viewer.as_ref().map(|v| &v.0))?;
    Ok(JSend::success(publication))
}

pub async fn search_publications(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<Json<JSend<Vec<Publication>>>, ApiError> {
    let tag = parse_tag(params.tag.as_deref())?;
    let found = publications::search(&state, &params.q, tag, params.autor.as_deref())?;
    Ok(JSend::success(found))
}

pub async fn event_calendar(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<CalendarParams>,
) -> Result<Json<JSend<Vec<Publication>>>, ApiError> {
    let start = input::parse_date("startDate", &params.start_date)?;
    let end = input::parse_date("endDate", &params.end_date)?;
    Ok(JSend::success(publications::calendar(&state, start, end)?))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<CommentRequest>,
) -> Result<(StatusCode, Json<JSend<Comment>>), ApiError> {
    let comment = publications::add_comment(&state, &id, &user, &req.texto)?;
    Ok(response::created(comment))
}

pub async fn request_edit(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(form): AppJson<PublicationInput>,
) -> Result<Json<JSend<Publication>>, ApiError> {
    let publication = publications::request_edit(&state, &id, form, &user).await?;
    Ok(JSend::success(publication))
}

pub async fn update_publication(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(form): AppJson<PublicationInput>,
) -> Result<Json<JSend<Publication>>, ApiError> {
    Ok(JSend::success(publications::update(&state, &id, form).await?))
}

pub async fn delete_publication(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    publications::reject(&state, &id).await?;
    Ok(JSend::success(()))
}
