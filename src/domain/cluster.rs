//! Local cluster identity as seen by brokers and trading partners.

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

/// Credentials and addressing for the local cluster.
///
/// Supplied by the cluster identity collaborator and read-only here.
#[derive(Debug, Clone)]
pub struct ClusterParameters {
    pub cluster_id: String,
    pub cluster_name: String,
    pub endpoint: String,
    pub token: Secret<String>,
}

impl ClusterParameters {
    pub fn new(
        cluster_id: impl Into<String>,
        cluster_name: impl Into<String>,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            cluster_name: cluster_name.into(),
            endpoint: endpoint.into(),
            token: Secret::new(token.into()),
        }
    }

    /// Token for outgoing requests.
    pub fn bearer_token(&self) -> &str {
        self.token.expose_secret()
    }
}

/// Public description of a cluster acting as a seller.
///
/// Embedded in every contract as the seller snapshot. Credentials are never
/// part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(rename = "clusterID", default)]
    pub cluster_id: String,

    #[serde(rename = "clusterName", default)]
    pub cluster_name: String,

    #[serde(default)]
    pub endpoint: String,

    #[serde(rename = "clusterPrettyName", default)]
    pub cluster_pretty_name: String,

    #[serde(rename = "clusterContractEndpoint", default)]
    pub cluster_contract_endpoint: String,
}

impl Provider {
    /// Builds the provider snapshot for the given parameters.
    pub fn from_parameters(
        parameters: &ClusterParameters,
        pretty_name: impl Into<String>,
        contract_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            cluster_id: parameters.cluster_id.clone(),
            cluster_name: parameters.cluster_name.clone(),
            endpoint: parameters.endpoint.clone(),
            cluster_pretty_name: pretty_name.into(),
            cluster_contract_endpoint: contract_endpoint.into(),
        }
    }
}
