use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::auth::CurrentUser;
use crate::services::input::nullable;
use crate::services::limits::{self, LimitStatus, TierLimit};
use crate::storage::models::Tier;
use crate::AppState;

/// `limite: null` resets the tier to its configured default.
#[derive(Debug, Deserialize)]
pub struct SetLimitRequest {
    pub tier: Tier,
    #[serde(default, deserialize_with = "nullable")]
    pub limite: Option<Option<u32>>,
}

pub async fn my_limits(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<JSend<LimitStatus>>, ApiError> {
    Ok(JSend::success(limits::status(&state, &user)?))
}

pub async fn tier_limits(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<TierLimit>>>, ApiError> {
    Ok(JSend::success(limits::tier_limits(&state)?))
}

pub async fn set_tier_limit(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SetLimitRequest>,
) -> Result<Json<JSend<TierLimit>>, ApiError> {
    let limite = req
        .limite
        .ok_or_else(|| ApiError::bad_request("limite is required (null resets the default)"))?;
    Ok(JSend::success(limits::set_tier_limit(&state, req.tier, limite)?))
}
