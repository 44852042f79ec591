use thiserror::Error;

use crate::storage::models::Tier;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub paypal: PaypalConfig,
    pub limits: LimitsConfig,
    /// Super-admin created on first start when the user collection is empty.
    pub bootstrap_admin: Option<BootstrapAdmin>,
    /// Passes internal error details through to 5xx responses.
    pub dev_mode: bool,
    /// Maximum upload size in bytes (per file)
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Absolute origin prepended to storage URLs, e.g. `https://komuness.cl`.
    /// Empty keeps URLs relative.
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory of the library file tree
    pub library_path: String,
    /// Route prefix under which library files are served
    pub library_public_path: String,
    /// Route prefix under which attachment blobs are served
    pub blob_public_path: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub api_base: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Price of one premium period, as a decimal string (`"10.00"`)
    pub premium_price: String,
    pub currency: String,
    pub premium_days: i64,
}

/// Per-tier publication limits used when neither the user nor the settings
/// collection overrides them.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub super_admin: u32,
    pub admin: u32,
    pub basic: u32,
    pub premium: u32,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            public_base_url: String::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            library_path: "./uploads/biblioteca".to_string(),
            library_public_path: "/api/biblioteca/files".to_string(),
            blob_public_path: "/api/files".to_string(),
        }
    }
}

impl Default for PaypalConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api-m.sandbox.paypal.com".to_string(),
            client_id: None,
            client_secret: None,
            premium_price: "10.00".to_string(),
            currency: "USD".to_string(),
            premium_days: 30,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            super_admin: 1000,
            admin: 1000,
            basic: 5,
            premium: 20,
        }
    }
}

impl LimitsConfig {
    pub fn for_tier(&self, tier: Tier) -> u32 {
        match tier {
            Tier::SuperAdmin => self.super_admin,
            Tier::Admin => self.admin,
            Tier::Basic => self.basic,
            Tier::Premium => self.premium,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let server = ServerConfig {
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_default(),
        };

        let storage_defaults = StorageConfig::default();
        let storage = StorageConfig {
            library_path: std::env::var("LIBRARY_STORAGE_PATH")
                .unwrap_or(storage_defaults.library_path),
            library_public_path: std::env::var("LIBRARY_PUBLIC_PATH")
                .unwrap_or(storage_defaults.library_public_path),
            blob_public_path: std::env::var("BLOB_PUBLIC_PATH")
                .unwrap_or(storage_defaults.blob_public_path),
        };

        let auth = AuthConfig {
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_default(),
            token_ttl_hours: env_parse("TOKEN_TTL_HOURS", 24 * 7),
            bcrypt_cost: env_parse("BCRYPT_COST", bcrypt::DEFAULT_COST),
        };

        let paypal_defaults = PaypalConfig::default();
        let paypal = PaypalConfig {
            api_base: std::env::var("PAYPAL_API_BASE")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(paypal_defaults.api_base),
            client_id: std::env::var("PAYPAL_CLIENT_ID").ok(),
            client_secret: std::env::var("PAYPAL_CLIENT_SECRET").ok(),
            premium_price: std::env::var("PREMIUM_PRICE")
                .unwrap_or(paypal_defaults.premium_price),
            currency: std::env::var("PREMIUM_CURRENCY").unwrap_or(paypal_defaults.currency),
            premium_days: env_parse("PREMIUM_DAYS", paypal_defaults.premium_days),
        };

        let limit_defaults = LimitsConfig::default();
        let limits = LimitsConfig {
            super_admin: env_parse("LIMIT_SUPER_ADMIN", limit_defaults.super_admin),
            admin: env_parse("LIMIT_ADMIN", limit_defaults.admin),
            basic: env_parse("LIMIT_BASIC", limit_defaults.basic),
            premium: env_parse("LIMIT_PREMIUM", limit_defaults.premium),
        };

        let bootstrap_admin = match (
            std::env::var("ADMIN_EMAIL").ok(),
            std::env::var("ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        let config = Config {
            server,
            storage,
            auth,
            paypal,
            limits,
            bootstrap_admin,
            dev_mode: env_flag("DEV_MODE"),
            max_upload_size: env_parse("MAX_UPLOAD_SIZE", 20 * 1024 * 1024), // 20MB
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "JWT_SECRET is required".to_string(),
            ));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::ValidationError(
                "BCRYPT_COST must be between 4 and 31".to_string(),
            ));
        }

        for (name, path) in [
            ("LIBRARY_PUBLIC_PATH", &self.storage.library_public_path),
            ("BLOB_PUBLIC_PATH", &self.storage.blob_public_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must start with '/'"
                )));
            }
        }

        if self.paypal.premium_price.parse::<f64>().map_or(true, |p| p <= 0.0) {
            return Err(ConfigError::ValidationError(
                "PREMIUM_PRICE must be a positive decimal".to_string(),
            ));
        }

        if self.paypal.client_id.is_none() || self.paypal.client_secret.is_none() {
            tracing::warn!(
                "PAYPAL_CLIENT_ID/PAYPAL_CLIENT_SECRET not set. Premium checkout will fail."
            );
        }

        Ok(())
    }

    /// Prefix a route path with the configured public origin.
    pub fn public_url(&self, path: &str) -> String {
        format!("{}{}", self.server.public_base_url, path)
    }
}
