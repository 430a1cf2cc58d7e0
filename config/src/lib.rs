//! # Configuration
//!
//! Process configuration for the Ludo tenant core: database endpoint,
//! credentials, pool sizing, and timeouts. Defaults suit local
//! development; the env loader overrides them per deployment.

pub mod config;
pub mod loader;

pub use config::{ConfigError, DatabaseConfig, LudoConfig};
pub use loader::load_from_env;
