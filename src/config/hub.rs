//! Subscriber hub configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Settings for local subscriber sessions
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Outbound queue length per subscriber session
    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,

    /// Liveness probe interval in seconds (0 disables)
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

impl HubConfig {
    pub fn probe_interval(&self) -> Option<Duration> {
        (self.probe_interval_secs > 0).then(|| Duration::from_secs(self.probe_interval_secs))
    }

    /// Validate hub configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.client_buffer == 0 {
            return Err(ValidationError::InvalidClientBuffer);
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            client_buffer: default_client_buffer(),
            probe_interval_secs: default_probe_interval(),
        }
    }
}

fn default_client_buffer() -> usize {
    64
}

fn default_probe_interval() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.client_buffer, 64);
        assert_eq!(config.probe_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_probe_interval_disables_probing() {
        let config = HubConfig {
            probe_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.probe_interval().is_none());
    }

    #[test]
    fn test_zero_buffer_is_rejected() {
        let config = HubConfig {
            client_buffer: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidClientBuffer));
    }
}
