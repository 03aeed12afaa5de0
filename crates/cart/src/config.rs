//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `HARVEST_API_URL` - Base URL of the Harvest backend API
//!
//! ## Optional
//! - `HARVEST_GUEST_CART_PATH` - Guest cart slot (default: .harvest/guest_cart.json)
//! - `HARVEST_HTTP_TIMEOUT_SECS` - Transport timeout (default: 15)
//! - `HARVEST_CATALOG_CACHE_TTL_SECS` - Product detail cache TTL (default: 300)
//! - `HARVEST_ACCESS_TOKEN` - Bearer token of a signed-in account
//! - `HARVEST_USER_ID` - Account ID matching the token
//! - `HARVEST_ROLE` - Account role: guest, client or producer (default: client)
//! - `HARVEST_SESSION_EXPIRES_AT` - RFC 3339 session expiry

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use harvest_core::{Identity, Role, Session, UserId};

const DEFAULT_GUEST_CART_PATH: &str = ".harvest/guest_cart.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Backend API base URL
    pub api_url: Url,
    /// Guest cart slot path
    pub guest_cart_path: PathBuf,
    /// Transport-level request timeout
    pub http_timeout: Duration,
    /// Product detail cache TTL
    pub catalog_cache_ttl: Duration,
    /// Signed-in account, if configured
    pub account: Option<AccountConfig>,
}

/// Signed-in account credentials.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct AccountConfig {
    /// Account ID
    pub user_id: UserId,
    /// Bearer token
    pub access_token: SecretString,
    /// Account role
    pub role: Role,
    /// Session expiry
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .field("role", &self.role)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl HarvestConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_required_env("HARVEST_API_URL")?)?;
        let guest_cart_path = PathBuf::from(get_env_or_default(
            "HARVEST_GUEST_CART_PATH",
            DEFAULT_GUEST_CART_PATH,
        ));
        let http_timeout = Duration::from_secs(parse_secs(
            "HARVEST_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let catalog_cache_ttl = Duration::from_secs(parse_secs(
            "HARVEST_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?);
        let account = AccountConfig::from_env()?;

        Ok(Self {
            api_url,
            guest_cart_path,
            http_timeout,
            catalog_cache_ttl,
            account,
        })
    }

    /// Configuration with defaults for everything but the API URL.
    #[must_use]
    pub fn with_api_url(api_url: Url) -> Self {
        Self {
            api_url,
            guest_cart_path: PathBuf::from(DEFAULT_GUEST_CART_PATH),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
            account: None,
        }
    }

    /// Identity described by the configured account, or anonymous.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.account.as_ref().map_or_else(Identity::anonymous, |account| {
            Identity::signed_in(
                Session {
                    user_id: account.user_id,
                    access_token: account.access_token.clone(),
                    expires_at: account.expires_at,
                },
                account.role,
            )
        })
    }
}

impl AccountConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(token) = get_optional_env("HARVEST_ACCESS_TOKEN") else {
            return Ok(None);
        };

        let user_id = get_required_env("HARVEST_USER_ID")?
            .parse::<UserId>()
            .map_err(|e| ConfigError::InvalidEnvVar("HARVEST_USER_ID".to_string(), e.to_string()))?;
        let role = get_env_or_default("HARVEST_ROLE", "client")
            .parse::<Role>()
            .map_err(|e| ConfigError::InvalidEnvVar("HARVEST_ROLE".to_string(), e.to_string()))?;
        let expires_at = get_optional_env("HARVEST_SESSION_EXPIRES_AT")
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        ConfigError::InvalidEnvVar(
                            "HARVEST_SESSION_EXPIRES_AT".to_string(),
                            e.to_string(),
                        )
                    })
            })
            .transpose()?;

        Ok(Some(Self {
            user_id,
            access_token: SecretString::from(token),
            role,
            expires_at,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a whole number of seconds.
fn parse_secs(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse the API base URL, forcing a trailing slash so relative joins keep
/// any path prefix.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("HARVEST_API_URL".to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "HARVEST_API_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
