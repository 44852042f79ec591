use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::services::publications;
use crate::storage::models::Publication;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RejectUpdateRequest {
    #[serde(default)]
    pub motivo: Option<String>,
}

pub async fn list_pending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<Publication>>>, ApiError> {
    Ok(JSend::success(publications::list_pending(&state)?))
}

pub async fn list_pending_updates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<Publication>>>, ApiError> {
    Ok(JSend::success(publications::list_pending_updates(&state)?))
}

pub async fn approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Publication>>, ApiError> {
    Ok(JSend::success(publications::approve(&state, &id)?))
}

pub async fn reject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    publications::reject(&state, &id).await?;
    Ok(JSend::success(()))
}

pub async fn approve_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Publication>>, ApiError> {
    Ok(JSend::success(publications::approve_edit(&state, &id).await?))
}

/// The body is optional; a reason, when given, is kept on the document.
pub async fn reject_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<AppJson<RejectUpdateRequest>>,
) -> Result<Json<JSend<Publication>>, ApiError> {
    let motivo = body.and_then(|AppJson(req)| req.motivo);
    Ok(JSend::success(publications::reject_edit(&state, &id, motivo)?))
}
