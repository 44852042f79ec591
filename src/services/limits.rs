//! Publication quota per user.
//!
//! A user's limit resolves as: personal override (`limite_publicaciones`) →
//! admin-configured tier limit (setting `limites.{tier}`) → configured default
//! for the tier.

use serde::Serialize;

use super::{ServiceError, ServiceResult};
use crate::storage::models::{Tier, User};
use crate::AppState;

const LIMIT_KEY_PREFIX: &str = "limites.";

pub fn setting_key(tier: Tier) -> String {
    format!("{LIMIT_KEY_PREFIX}{}", tier.as_u8())
}

/// Where a tier's limit currently comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitSource {
    User,
    Setting,
    Default,
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitStatus {
    pub tier: Tier,
    pub limit: u32,
    pub current: u32,
    pub remaining: u32,
    pub source: LimitSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierLimit {
    pub tier: Tier,
    pub limit: u32,
    pub source: LimitSource,
}

fn tier_limit(state: &AppState, tier: Tier) -> ServiceResult<TierLimit> {
    if let Some(setting) = state.db.get_setting(&setting_key(tier))? {
        if let Ok(limit) = u32::try_from(setting.value) {
            return Ok(TierLimit {
                tier,
                limit,
                source: LimitSource::Setting,
            });
        }
        tracing::warn!(key = %setting.key, value = setting.value, "Ignoring out-of-range limit setting");
    }
    Ok(TierLimit {
        tier,
        limit: state.config.limits.for_tier(tier),
        source: LimitSource::Default,
    })
}

/// Resolve the publication quota that applies to `user`.
pub fn effective_limit(state: &AppState, user: &User) -> ServiceResult<(u32, LimitSource)> {
    if let Some(limit) = user.limite_publicaciones {
        return Ok((limit, LimitSource::User));
    }
    let resolved = tier_limit(state, user.tier)?;
    Ok((resolved.limit, resolved.source))
}

/// Number of publications the user owns, whatever their moderation state.
pub fn current_count(state: &AppState, user_id: &str) -> ServiceResult<u32> {
    let count = state.db.count_publications_by_author(user_id)?;
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

pub fn status(state: &AppState, user: &User) -> ServiceResult<LimitStatus> {
    let (limit, source) = effective_limit(state, user)?;
    let current = current_count(state, &user.id)?;
    Ok(LimitStatus {
        tier: user.tier,
        limit,
        current,
        remaining: limit.saturating_sub(current),
        source,
    })
}

/// Refuse when the user has no quota left.
pub fn check(state: &AppState, user: &User) -> ServiceResult<LimitStatus> {
    let status = status(state, user)?;
    if status.current >= status.limit {
        return Err(ServiceError::LimitExceeded {
            current: status.current,
            limit: status.limit,
            tier: status.tier,
        });
    }
    Ok(status)
}

pub fn tier_limits(state: &AppState) -> ServiceResult<Vec<TierLimit>> {
    Tier::ALL.iter().map(|tier| tier_limit(state, *tier)).collect()
}

/// Set (or with `None`, reset to default) the limit of a tier.
pub fn set_tier_limit(state: &AppState, tier: Tier, limit: Option<u32>) -> ServiceResult<TierLimit> {
    let key = setting_key(tier);
    match limit {
        Some(limit) => {
            state.db.put_setting(&key, i64::from(limit))?;
            tracing::info!(tier = tier.as_u8(), limit, "Updated tier publication limit");
        }
        None => {
            state.db.delete_setting(&key)?;
            tracing::info!(tier = tier.as_u8(), "Reset tier publication limit to default");
        }
    }
    tier_limit(state, tier)
}
