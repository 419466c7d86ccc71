//! Broker synchronization configuration

use serde::Deserialize;
use std::time::Duration;

use crate::domain::broker::BackoffPolicy;

use super::error::ValidationError;

/// Reconnect and synchronization settings for brokers
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSyncConfig {
    /// First reconnect delay in seconds
    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_secs: u64,

    /// Delay above which a broker is abandoned
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_secs: u64,

    /// Per broker, per sync call timeout in seconds
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,

    /// Periodic full sync interval in seconds (0 disables)
    #[serde(default)]
    pub sync_interval_secs: u64,
}

impl BrokerSyncConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs(self.backoff_initial_secs),
            Duration::from_secs(self.backoff_cap_secs),
        )
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    /// `None` when periodic reconciliation is disabled
    pub fn sync_interval(&self) -> Option<Duration> {
        (self.sync_interval_secs > 0).then(|| Duration::from_secs(self.sync_interval_secs))
    }

    /// Validate broker configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backoff_initial_secs == 0 {
            return Err(ValidationError::InvalidBackoffInitial);
        }
        if self.backoff_cap_secs < self.backoff_initial_secs {
            return Err(ValidationError::InvalidBackoffCap);
        }
        if self.remote_timeout_secs == 0 {
            return Err(ValidationError::InvalidRemoteTimeout);
        }
        Ok(())
    }
}

impl Default for BrokerSyncConfig {
    fn default() -> Self {
        Self {
            backoff_initial_secs: default_backoff_initial(),
            backoff_cap_secs: default_backoff_cap(),
            remote_timeout_secs: default_remote_timeout(),
            sync_interval_secs: 0,
        }
    }
}

fn default_backoff_initial() -> u64 {
    1
}

fn default_backoff_cap() -> u64 {
    300
}

fn default_remote_timeout() -> u64 {
    10
}
