use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{self, ApiError, AppJson, AppQuery, JSend};
use crate::services::categories;
use crate::storage::models::Category;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Include deactivated categories
    #[serde(default)]
    pub todas: bool,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub activo: Option<bool>,
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<JSend<Vec<Category>>>, ApiError> {
    Ok(JSend::success(categories::list(&state, params.todas)?))
}

pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Category>>, ApiError> {
    Ok(JSend::success(categories::get(&state, &id)?))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CategoryRequest>,
) -> Result<(StatusCode, Json<JSend<Category>>), ApiError> {
    let category = categories::create(&state, req.nombre.as_deref())?;
    Ok(response::created(category))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<CategoryRequest>,
) -> Result<Json<JSend<Category>>, ApiError> {
    let category = categories::update(&state, &id, req.nombre.as_deref(), req.activo)?;
    Ok(JSend::success(category))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Category>>, ApiError> {
    Ok(JSend::success(categories::deactivate(&state, &id)?))
}
