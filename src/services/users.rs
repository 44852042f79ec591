//! Accounts, sessions and membership tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::input::{self, nullable};
use super::{ServiceError, ServiceResult};
use crate::auth;
use crate::storage::models::{Tier, User};
use crate::AppState;

const MIN_PASSWORD: usize = 8;
const MAX_PASSWORD: usize = 72;
const MAX_NAME: usize = 100;

/// Public shape of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub nombre: String,
    pub apellido: Option<String>,
    pub email: String,
    pub tipo_usuario: Tier,
    pub limite_publicaciones: Option<u32>,
    pub premium_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id.clone(),
            nombre: user.nombre.clone(),
            apellido: user.apellido.clone(),
            email: user.email.clone(),
            tipo_usuario: user.tier,
            limite_publicaciones: user.limite_publicaciones,
            premium_until: user.premium_until,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub nombre: Option<String>,
    #[serde(default)]
    pub apellido: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Admin changes to an account. `limitePublicaciones: null` clears the
/// personal override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default)]
    pub tipo_usuario: Option<u8>,
    #[serde(default, deserialize_with = "nullable")]
    pub limite_publicaciones: Option<Option<u32>>,
}

pub struct Session {
    pub token: String,
    pub user: User,
}

fn normalize_email(email: Option<&str>) -> ServiceResult<String> {
    let email = email.map(|e| e.trim().to_lowercase()).unwrap_or_default();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(ServiceError::validation("email is not a valid address"));
    }
    Ok(email)
}

fn validate_password(password: Option<&str>) -> ServiceResult<&str> {
    let password = password.unwrap_or_default();
    if password.chars().count() < MIN_PASSWORD {
        return Err(ServiceError::validation(format!(
            "password must be at least {MIN_PASSWORD} characters"
        )));
    }
    // bcrypt ignores everything past 72 bytes
    if password.len() > MAX_PASSWORD {
        return Err(ServiceError::validation(format!(
            "password must be at most {MAX_PASSWORD} bytes"
        )));
    }
    Ok(password)
}

async fn hash(state: &AppState, password: &str) -> ServiceResult<String> {
    let password = password.to_string();
    let cost = state.config.auth.bcrypt_cost;
    tokio::task::spawn_blocking(move || auth::hash_password(&password, cost))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

async fn verify(password: &str, hash: &str) -> ServiceResult<bool> {
    let (password, hash) = (password.to_string(), hash.to_string());
    tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

fn issue(state: &AppState, user: User) -> ServiceResult<Session> {
    let token = auth::issue_token(&state.config.auth, &user)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    Ok(Session { token, user })
}

async fn create_user(
    state: &AppState,
    nombre: String,
    apellido: Option<String>,
    email: String,
    password: &str,
    tier: Tier,
) -> ServiceResult<User> {
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        nombre,
        apellido,
        email,
        password_hash: hash(state, password).await?,
        tier,
        limite_publicaciones: None,
        premium_until: None,
        created_at: Utc::now(),
    };
    if !state.db.insert_user(&user)? {
        return Err(ServiceError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }
    Ok(user)
}

pub async fn register(state: &AppState, form: RegisterInput) -> ServiceResult<Session> {
    let nombre = input::required_text("nombre", form.nombre.as_deref(), MAX_NAME)?;
    let apellido = form
        .apellido
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| input::required_text("apellido", Some(a), MAX_NAME))
        .transpose()?;
    let email = normalize_email(form.email.as_deref())?;
    let password = validate_password(form.password.as_deref())?;

    let user = create_user(state, nombre, apellido, email, password, Tier::Basic).await?;
    tracing::info!(user_id = %user.id, "User registered");
    issue(state, user)
}

pub async fn login(state: &AppState, email: &str, password: &str) -> ServiceResult<Session> {
    let invalid = || ServiceError::Unauthorized("Invalid email or password".to_string());

    let user = state.db.get_user_by_email(email)?.ok_or_else(invalid)?;
    if !verify(password, &user.password_hash).await? {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(invalid());
    }

    let user = refresh_membership(state, user)?;
    tracing::info!(user_id = %user.id, "User logged in");
    issue(state, user)
}

/// Downgrade a premium member whose period has ended.
pub fn refresh_membership(state: &AppState, user: User) -> ServiceResult<User> {
    let now = Utc::now();
    if !user.premium_expired(now) {
        return Ok(user);
    }

    let refreshed = state
        .db
        .modify_user(&user.id, |u| -> ServiceResult<()> {
            if u.premium_expired(now) {
                u.tier = Tier::Basic;
                u.premium_until = None;
            }
            Ok(())
        })?
        .map(|(u, ())| u)
        .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))?;

    tracing::info!(user_id = %refreshed.id, "Premium membership expired");
    Ok(refreshed)
}

pub async fn change_password(
    state: &AppState,
    user: &User,
    current: &str,
    new_password: &str,
) -> ServiceResult<()> {
    if !verify(current, &user.password_hash).await? {
        return Err(ServiceError::validation("Current password is incorrect"));
    }
    let new_password = validate_password(Some(new_password))?;
    let password_hash = hash(state, new_password).await?;

    state
        .db
        .modify_user(&user.id, |u| -> ServiceResult<()> {
            u.password_hash = password_hash;
            Ok(())
        })?
        .ok_or_else(|| ServiceError::not_found("User not found"))?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(())
}

pub fn list(state: &AppState) -> ServiceResult<Vec<User>> {
    Ok(state.db.list_users()?)
}

/// Change a user's tier or personal limit. Only super-admins may touch
/// super-admin accounts or hand out admin tiers.
pub fn update(state: &AppState, id: &str, changes: UserUpdate, caller: &User) -> ServiceResult<User> {
    let tier = changes
        .tipo_usuario
        .map(Tier::try_from)
        .transpose()
        .map_err(ServiceError::Validation)?;
    if tier.is_none() && changes.limite_publicaciones.is_none() {
        return Err(ServiceError::validation("no changes were provided"));
    }
    let is_super = caller.tier == Tier::SuperAdmin;
    if tier.is_some_and(Tier::is_admin) && !is_super {
        return Err(ServiceError::forbidden("Only a super-admin can grant admin tiers"));
    }

    let (user, ()) = state
        .db
        .modify_user(id, |u| -> ServiceResult<()> {
            if u.tier == Tier::SuperAdmin && !is_super {
                return Err(ServiceError::forbidden("Only a super-admin can modify this account"));
            }
            if let Some(tier) = tier {
                u.tier = tier;
                if tier != Tier::Premium {
                    u.premium_until = None;
                }
            }
            if let Some(limit) = changes.limite_publicaciones {
                u.limite_publicaciones = limit;
            }
            Ok(())
        })?
        .ok_or_else(|| ServiceError::not_found("User not found"))?;

    tracing::info!(
        user_id = %id,
        tier = user.tier.as_u8(),
        limit = ?user.limite_publicaciones,
        by = %caller.id,
        "User updated"
    );
    Ok(user)
}

pub fn delete(state: &AppState, id: &str, caller: &User) -> ServiceResult<()> {
    if id == caller.id {
        return Err(ServiceError::validation("You cannot delete your own account"));
    }
    if !state.db.delete_user(id)? {
        return Err(ServiceError::not_found("User not found"));
    }
    tracing::info!(user_id = %id, by = %caller.id, "User deleted");
    Ok(())
}

/// Create the configured super-admin when there are no users yet.
pub async fn bootstrap_admin(state: &AppState) -> ServiceResult<Option<User>> {
    let Some(ref admin) = state.config.bootstrap_admin else {
        return Ok(None);
    };
    if state.db.count_users()? > 0 {
        return Ok(None);
    }

    let email = normalize_email(Some(&admin.email))?;
    let password = validate_password(Some(&admin.password))?;
    let user = create_user(
        state,
        "Administrador".to_string(),
        None,
        email,
        password,
        Tier::SuperAdmin,
    )
    .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Bootstrapped super-admin account");
    Ok(Some(user))
}
