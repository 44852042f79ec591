use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::services::{limits, users};
use crate::storage::models::{Tier, User};
use crate::AppState;

/// The authenticated caller, placed in request extensions by [`require_auth`]
/// or [`optional_auth`]. Extract `Option<CurrentUser>` on routes where the
/// caller may be anonymous.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verify the token and load the user it names. An expired premium
/// membership is downgraded on the way.
fn authenticate(state: &AppState, token: &str) -> Result<User, ApiError> {
    let claims = super::verify_token(&state.config.auth, token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        ApiError::unauthorized("Invalid or expired token")
    })?;

    let user = state
        .db
        .get_user(&claims.sub)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    Ok(users::refresh_membership(state, user)?)
}

/// Reject requests without a valid bearer token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        tracing::debug!("Missing bearer token");
        ApiError::unauthorized("Authentication required")
    })?;
    let user = authenticate(&state, token)?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Attach the caller when a valid token is present; anonymous otherwise.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = bearer_token(request.headers()) {
        match authenticate(&state, token) {
            Ok(user) => {
                request.extensions_mut().insert(CurrentUser(user));
            }
            Err(ApiError::Fail(..)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(next.run(request).await)
}

fn caller_tier(request: &Request) -> Result<Tier, ApiError> {
    request
        .extensions()
        .get::<CurrentUser>()
        .map(|u| u.0.tier)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

/// Admins and super-admins only. Must run after [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    if !caller_tier(&request)?.is_admin() {
        return Err(ApiError::forbidden("Administrator access required"));
    }
    Ok(next.run(request).await)
}

/// Super-admins only. Must run after [`require_auth`].
pub async fn require_super_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    if caller_tier(&request)? != Tier::SuperAdmin {
        return Err(ApiError::forbidden("Super-administrator access required"));
    }
    Ok(next.run(request).await)
}

/// Refuse a submission once the caller has used up their publication quota.
/// Must run after [`require_auth`].
pub async fn enforce_publication_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let status = limits::check(&state, &user.0)?;
    tracing::debug!(
        user_id = %user.0.id,
        current = status.current,
        limit = status.limit,
        "Publication quota checked"
    );
    Ok(next.run(request).await)
}
