//! # Environment Variable Loader
//!
//! Loads configuration from environment variables following 12-factor app
//! principles. Variables override defaults; anything unset keeps its
//! default.
//!
//! # Variables (`LD_*`)
//! - `LD_DB_HOST`: database host (default: "localhost")
//! - `LD_DB_PORT`: database port (default: 27017)
//! - `LD_DB_USERNAME` / `LD_DB_PASSWORD`: credentials (default: unset)
//! - `LD_DB_AUTH_SOURCE`: auth database (default: "admin")
//! - `LD_DB_SYSTEM_DATABASE`: cross-tenant database name (default: "ludo")
//! - `LD_DB_MAX_POOL_SIZE`: driver pool cap (default: 10)
//! - `LD_DB_CONNECT_TIMEOUT_SECS`: TCP connect timeout (default: 10)
//! - `LD_DB_SELECTION_TIMEOUT_SECS`: server selection timeout (default: 30)

use std::env;
use std::str::FromStr;

use tracing::debug;

use crate::config::{ConfigError, LudoConfig};

fn env_parsed<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: name.to_string(),
                reason: format!("could not parse {raw:?}"),
            }),
        Err(_) => Ok(None),
    }
}

/// Load configuration from the environment, validated.
pub fn load_from_env() -> Result<LudoConfig, ConfigError> {
    let mut config = LudoConfig::default();
    let db = &mut config.database;

    if let Ok(host) = env::var("LD_DB_HOST") {
        db.host = host;
    }
    if let Some(port) = env_parsed("LD_DB_PORT")? {
        db.port = port;
    }
    if let Ok(username) = env::var("LD_DB_USERNAME") {
        db.username = Some(username);
    }
    if let Ok(password) = env::var("LD_DB_PASSWORD") {
        db.password = Some(password);
    }
    if let Ok(auth_source) = env::var("LD_DB_AUTH_SOURCE") {
        db.auth_source = auth_source;
    }
    if let Ok(system_database) = env::var("LD_DB_SYSTEM_DATABASE") {
        db.system_database = system_database;
    }
    if let Some(size) = env_parsed("LD_DB_MAX_POOL_SIZE")? {
        db.max_pool_size = size;
    }
    if let Some(secs) = env_parsed("LD_DB_CONNECT_TIMEOUT_SECS")? {
        db.connect_timeout_secs = secs;
    }
    if let Some(secs) = env_parsed("LD_DB_SELECTION_TIMEOUT_SECS")? {
        db.selection_timeout_secs = secs;
    }

    config.validate_all()?;
    debug!(
        host = %config.database.host,
        port = config.database.port,
        system_database = %config.database.system_database,
        "configuration loaded from environment"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "LD_DB_HOST",
            "LD_DB_PORT",
            "LD_DB_USERNAME",
            "LD_DB_PASSWORD",
            "LD_DB_AUTH_SOURCE",
            "LD_DB_SYSTEM_DATABASE",
            "LD_DB_MAX_POOL_SIZE",
            "LD_DB_CONNECT_TIMEOUT_SECS",
            "LD_DB_SELECTION_TIMEOUT_SECS",
        ] {
            unsafe { env::remove_var(name) };
        }
    }

    #[test]
    #[serial]
    fn unset_environment_yields_defaults() {
        clear_env();
        let config = load_from_env().unwrap();
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 27017);
        assert_eq!(config.database.system_database, "ludo");
    }

    #[test]
    #[serial]
    fn variables_override_defaults() {
        clear_env();
        unsafe {
            env::set_var("LD_DB_HOST", "db.internal");
            env::set_var("LD_DB_PORT", "28000");
            env::set_var("LD_DB_MAX_POOL_SIZE", "25");
        }
        let config = load_from_env().unwrap();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 28000);
        assert_eq!(config.database.max_pool_size, 25);
        clear_env();
    }

    #[test]
    #[serial]
    fn unparsable_value_is_a_typed_error() {
        clear_env();
        unsafe { env::set_var("LD_DB_PORT", "not-a-port") };
        assert!(load_from_env().is_err());
        clear_env();
    }
}
