//! Local cluster identity configuration

use secrecy::Secret;
use serde::Deserialize;

use super::error::ValidationError;

/// Identity of the local cluster, handed to brokers and sellers
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Cluster identifier (also the buyer id in contracts)
    pub cluster_id: String,

    /// Cluster name
    #[serde(default)]
    pub cluster_name: String,

    /// Endpoint other clusters reach this cluster on
    #[serde(default)]
    pub endpoint: String,

    /// Cluster token, presented to sellers as bearer credential
    #[serde(default = "default_token")]
    pub token: Secret<String>,

    /// Human readable name shown in broker catalogs
    #[serde(default)]
    pub pretty_name: String,

    /// Contract endpoint advertised to brokers (required for registration)
    pub contract_endpoint: Option<String>,
}

impl ClusterConfig {
    /// Validate cluster configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cluster_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("cluster.cluster_id"));
        }
        Ok(())
    }
}

fn default_token() -> Secret<String> {
    Secret::new(String::new())
}
