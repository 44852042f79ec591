use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{self, ApiError, AppJson, JSend};
use crate::auth::CurrentUser;
use crate::services::users::{self, RegisterInput, Session, UserUpdate, UserView};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserView,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        SessionResponse {
            token: session.token,
            user: UserView::from(&session.user),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub actual: String,
    #[serde(default)]
    pub nueva: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterInput>,
) -> Result<(StatusCode, Json<JSend<SessionResponse>>), ApiError> {
    let session = users::register(&state, req).await?;
    Ok(response::created(session.into()))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<JSend<SessionResponse>>, ApiError> {
    let session = users::login(&state, &req.email, &req.password).await?;
    Ok(JSend::success(session.into()))
}

pub async fn check(CurrentUser(user): CurrentUser) -> Json<JSend<UserView>> {
    JSend::success(UserView::from(&user))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<Json<JSend<()>>, ApiError> {
    users::change_password(&state, &user, &req.actual, &req.nueva).await?;
    Ok(JSend::success(()))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<UserView>>>, ApiError> {
    let all = users::list(&state)?;
    Ok(JSend::success(all.iter().map(UserView::from).collect()))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<UserUpdate>,
) -> Result<Json<JSend<UserView>>, ApiError> {
    let user = users::update(&state, &id, req, &caller)?;
    Ok(JSend::success(UserView::from(&user)))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    users::delete(&state, &id, &caller)?;
    Ok(JSend::success(()))
}
