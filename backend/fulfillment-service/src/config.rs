//! Configuration management for the fulfillment service
//!
//! Settings come from environment variables, optionally seeded from a `.env`
//! file during local development.
//!
//! Required:
//! - `DATABASE_URL`
//! - `RAZORPAY_KEY_ID`, `RAZORPAY_KEY_SECRET` (`RAZORPAY_KEY` / `RAZORPAY_SECRET` accepted)
//! - `STORAGE_BUCKET`
//!
//! Everything else has a development default.

use anyhow::{Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub gateway: GatewaySettings,
    pub storage: StorageSettings,
    pub email: EmailSettings,
    pub security: SecuritySettings,
    pub cors: CorsSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            server: ServerSettings::from_env()?,
            database: DatabaseSettings::from_env()?,
            redis: RedisSettings::from_env(),
            gateway: GatewaySettings::from_env()?,
            storage: StorageSettings::from_env()?,
            email: EmailSettings::from_env()?,
            security: SecuritySettings::from_env()?,
            cors: CorsSettings::from_env(),
        })
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
            workers: env::var("SERVER_WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .context("Invalid SERVER_WORKERS")?,
        })
    }
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,
        })
    }
}

/// Redis settings. Without a URL, pending OTPs live in process memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    pub url: Option<String>,
}

impl RedisSettings {
    fn from_env() -> Self {
        Self {
            url: non_empty_var("REDIS_URL"),
        }
    }
}

/// Payment gateway credentials
///
/// `key_secret` also keys the payment signature HMAC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl GatewaySettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            key_id: env::var("RAZORPAY_KEY_ID")
                .or_else(|_| env::var("RAZORPAY_KEY"))
                .context("RAZORPAY_KEY_ID must be set")?,
            key_secret: env::var("RAZORPAY_KEY_SECRET")
                .or_else(|_| env::var("RAZORPAY_SECRET"))
                .context("RAZORPAY_KEY_SECRET must be set")?,
            base_url: env::var("RAZORPAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            timeout_secs: env::var("RAZORPAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid RAZORPAY_TIMEOUT_SECS")?,
        })
    }
}

/// Object storage holding the purchasable files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Prefix applied to file names extracted from public URL references
    pub key_prefix: String,
    pub force_path_style: bool,
}

impl StorageSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            bucket: env::var("STORAGE_BUCKET").context("STORAGE_BUCKET must be set")?,
            region: env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: non_empty_var("STORAGE_ENDPOINT"),
            access_key_id: non_empty_var("STORAGE_ACCESS_KEY_ID"),
            secret_access_key: non_empty_var("STORAGE_SECRET_ACCESS_KEY"),
            key_prefix: env::var("STORAGE_KEY_PREFIX").unwrap_or_else(|_| "projects/".to_string()),
            force_path_style: parse_bool(
                "STORAGE_FORCE_PATH_STYLE",
                env::var("STORAGE_FORCE_PATH_STYLE").ok().as_deref(),
                false,
            )?,
        })
    }
}

/// SMTP settings. An empty host puts the notifier in no-op mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
}

impl EmailSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .context("Invalid SMTP_PORT")?,
            smtp_username: non_empty_var("SMTP_USERNAME"),
            smtp_password: non_empty_var("SMTP_PASSWORD"),
            smtp_from: env::var("SMTP_FROM")
                .unwrap_or_else(|_| "Project Store <no-reply@localhost>".to_string()),
            use_starttls: parse_bool(
                "SMTP_USE_STARTTLS",
                env::var("SMTP_USE_STARTTLS").ok().as_deref(),
                true,
            )?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySettings {
    pub verification_token_secret: String,
    /// Reject purchases without a valid email verification token
    pub require_verified_email: bool,
}

impl SecuritySettings {
    fn from_env() -> Result<Self> {
        let verification_token_secret = match non_empty_var("VERIFICATION_TOKEN_SECRET") {
            Some(secret) => secret,
            None => {
                warn!(
                    "VERIFICATION_TOKEN_SECRET not set; using a random per-process secret \
                     (tokens will not survive restarts or work across instances)"
                );
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(64)
                    .map(char::from)
                    .collect()
            }
        };

        Ok(Self {
            verification_token_secret,
            require_verified_email: parse_bool(
                "REQUIRE_VERIFIED_EMAIL",
                env::var("REQUIRE_VERIFIED_EMAIL").ok().as_deref(),
                false,
            )?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSettings {
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
}

impl CorsSettings {
    fn from_env() -> Self {
        Self {
            allowed_origins: split_list(&env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default()),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, value: Option<&str>, default: bool) -> Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("Invalid {}: expected a boolean, got {:?}", key, v),
        },
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
