//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CATALOG_CONNECTOR` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use catalog_connector::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod brokers;
mod cluster;
mod error;
mod hub;
mod server;

pub use brokers::BrokerSyncConfig;
pub use cluster::ClusterConfig;
pub use error::{ConfigError, ValidationError};
pub use hub::HubConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Local cluster identity
    pub cluster: ClusterConfig,

    /// Broker reconnect and sync settings
    #[serde(default)]
    pub brokers: BrokerSyncConfig,

    /// Subscriber hub settings
    #[serde(default)]
    pub hub: HubConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CATALOG_CONNECTOR` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CATALOG_CONNECTOR__SERVER__PORT=6002` -> `server.port = 6002`
    /// - `CATALOG_CONNECTOR__CLUSTER__CLUSTER_ID=...` -> `cluster.cluster_id = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CATALOG_CONNECTOR")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.cluster.validate()?;
        self.brokers.validate()?;
        self.hub.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("CATALOG_CONNECTOR__CLUSTER__CLUSTER_ID", "cluster-a");
        env::set_var("CATALOG_CONNECTOR__CLUSTER__TOKEN", "cluster-token");
    }

    fn clear_env() {
        env::remove_var("CATALOG_CONNECTOR__CLUSTER__CLUSTER_ID");
        env::remove_var("CATALOG_CONNECTOR__CLUSTER__TOKEN");
        env::remove_var("CATALOG_CONNECTOR__CLUSTER__CONTRACT_ENDPOINT");
        env::remove_var("CATALOG_CONNECTOR__SERVER__PORT");
        env::remove_var("CATALOG_CONNECTOR__SERVER__ENVIRONMENT");
        env::remove_var("CATALOG_CONNECTOR__BROKERS__BACKOFF_CAP_SECS");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.cluster.cluster_id, "cluster-a");
        assert_eq!(config.cluster.token.expose_secret(), "cluster-token");
        assert!(config.cluster.contract_endpoint.is_none());
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_section_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 6002);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.brokers.backoff_cap_secs, 300);
        assert_eq!(config.hub.client_buffer, 64);
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CATALOG_CONNECTOR__SERVER__PORT", "7000");
        env::set_var("CATALOG_CONNECTOR__SERVER__ENVIRONMENT", "production");
        env::set_var(
            "CATALOG_CONNECTOR__CLUSTER__CONTRACT_ENDPOINT",
            "https://alpha.example/contracts",
        );
        env::set_var("CATALOG_CONNECTOR__BROKERS__BACKOFF_CAP_SECS", "60");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 7000);
        assert!(config.is_production());
        assert_eq!(
            config.cluster.contract_endpoint.as_deref(),
            Some("https://alpha.example/contracts")
        );
        assert_eq!(config.brokers.backoff_cap_secs, 60);
    }

    #[test]
    fn test_missing_cluster_section_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
