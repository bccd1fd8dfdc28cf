//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CART_INVENTORY_URL` - Inventory query service endpoint
//!
//! ## Optional
//! - `CART_INVENTORY_TOKEN` - Bearer token for the inventory service
//! - `CART_STORAGE_DIR` - Directory for the persisted cart (default: data)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart manager configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Inventory query service configuration
    pub inventory: InventoryServiceConfig,
    /// Directory holding the persisted cart snapshot
    pub storage_dir: PathBuf,
}

/// Inventory query service configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct InventoryServiceConfig {
    /// Endpoint queried for availability checks
    pub endpoint: Url,
    /// Optional bearer token sent with every check
    pub access_token: Option<SecretString>,
}

impl std::fmt::Debug for InventoryServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryServiceConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl CartConfig {
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

        Ok(Self {
            inventory: InventoryServiceConfig::from_env()?,
            storage_dir: PathBuf::from(get_env_or_default("CART_STORAGE_DIR", "data")),
        })
    }
}

impl InventoryServiceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint = parse_endpoint("CART_INVENTORY_URL", &get_required_env("CART_INVENTORY_URL")?)?;
        let access_token = get_optional_env("CART_INVENTORY_TOKEN").map(SecretString::from);
        Ok(Self {
            endpoint,
            access_token,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an endpoint URL, rejecting non-HTTP schemes.
fn parse_endpoint(var_name: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}
