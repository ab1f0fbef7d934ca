//! Bootstrap configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//! The admin e-mail and password have no default.

use std::env;
use std::path::PathBuf;

use crate::pool::DbConfig;

/// Settings for the `bootstrap` binary.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// SQLite file, created when missing
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Login of the initial administrator
    pub admin_email: String,

    /// Password of the initial administrator (never logged)
    pub admin_password: String,

    /// Display name of the initial administrator
    pub admin_name: String,
}

impl BootstrapConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingRequired(key.to_string()))
        };

        let config = BootstrapConfig {
            database_path: lookup("ORDERDESK_DATABASE_PATH")
                .unwrap_or_else(|| "./orderdesk.db".to_string())
                .into(),

            max_connections: lookup("ORDERDESK_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("ORDERDESK_MAX_CONNECTIONS".to_string()))?,

            admin_email: required("ORDERDESK_ADMIN_EMAIL")?,

            admin_password: required("ORDERDESK_ADMIN_PASSWORD")?,

            admin_name: lookup("ORDERDESK_ADMIN_NAME")
                .unwrap_or_else(|| "Administrator".to_string()),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "ORDERDESK_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Pool settings for this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
