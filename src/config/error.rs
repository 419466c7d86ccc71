//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid socket address: {0}")]
    InvalidAddress(String),

    #[error("Backoff initial delay must be at least one second")]
    InvalidBackoffInitial,

    #[error("Backoff cap must not be below the initial delay")]
    InvalidBackoffCap,

    #[error("Remote timeout must be at least one second")]
    InvalidRemoteTimeout,

    #[error("Client buffer must hold at least one message")]
    InvalidClientBuffer,
}
