//! Configuration structs with defaults and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Connection settings shared by every tenant database plus the system
/// database. The tenant database name itself is resolved per request; the
/// rest is static for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    /// Optional credentials; both must be set for authenticated URIs.
    pub username: Option<String>,
    pub password: Option<String>,

    /// Database authenticated against when credentials are present.
    pub auth_source: String,

    /// Name of the fixed cross-tenant database (companies, global users,
    /// setting templates).
    #[validate(length(min = 1, max = 63))]
    pub system_database: String,

    /// Per-connection driver pool cap.
    #[validate(range(min = 1, max = 200))]
    pub max_pool_size: u32,

    /// TCP connect timeout in seconds.
    #[validate(range(min = 1, max = 300))]
    pub connect_timeout_secs: u64,

    /// Server selection timeout in seconds; bounds how long an operation
    /// waits for a usable server before failing.
    #[validate(range(min = 1, max = 300))]
    pub selection_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 27017,
            username: None,
            password: None,
            auth_source: "admin".to_string(),
            system_database: "ludo".to_string(),
            max_pool_size: 10,
            connect_timeout_secs: 10,
            selection_timeout_secs: 30,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LudoConfig {
    #[validate(nested)]
    pub database: DatabaseConfig,
}

impl LudoConfig {
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.database.username.is_some() != self.database.password.is_some() {
            return Err(ConfigError::InvalidValue {
                field: "database.username/password".to_string(),
                reason: "credentials must be set together or not at all".to_string(),
            });
        }
        Ok(())
    }
}
