//! Bearer-token sessions and password hashing.

mod middleware;

pub use middleware::{
    enforce_publication_limit, optional_auth, require_admin, require_auth, require_super_admin,
    CurrentUser,
};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::storage::models::User;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Tier at issue time. Informational only; requests re-read the user.
    pub tier: u8,
    pub exp: i64,
    pub iat: i64,
}

pub fn issue_token(config: &AuthConfig, user: &User) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.clone(),
        tier: user.tier.as_u8(),
        exp: (now + Duration::hours(config.token_ttl_hours)).timestamp(),
        iat: now.timestamp(),
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// Verify signature and expiry.
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, AuthError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(data.claims)
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be verified");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::Tier;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
        }
    }

    fn user() -> User {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            nombre: "Ana".to_string(),
            apellido: None,
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            tier: Tier::Premium,
            limite_publicaciones: None,
            premium_until: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let user = user();
        let token = issue_token(&config(), &user).unwrap();
        let claims = verify_token(&config(), &token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.tier, 3);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_rejects_foreign_and_expired_tokens() {
        let user = user();
        let token = issue_token(&config(), &user).unwrap();

        let other = AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..config()
        };
        assert!(verify_token(&other, &token).is_err());

        let expired = AuthConfig {
            token_ttl_hours: -2,
            ..config()
        };
        let stale = issue_token(&expired, &user).unwrap();
        assert!(verify_token(&config(), &stale).is_err());

        assert!(verify_token(&config(), "invalid.token.here").is_err());
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("correcto-caballo", 4).unwrap();
        assert!(verify_password("correcto-caballo", &hash));
        assert!(!verify_password("incorrecto", &hash));
        assert!(!verify_password("correcto-caballo", "not-a-hash"));
    }
}
