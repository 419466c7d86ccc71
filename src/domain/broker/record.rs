//! Broker relationships and the registration handshake.

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::domain::cluster::ClusterParameters;
use crate::domain::foundation::BrokerId;

/// A broker the local cluster trusts.
///
/// `enabled = false` means known but paused. An unreachable broker is
/// removed instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerRecord {
    #[serde(rename = "brokerID")]
    pub id: BrokerId,

    #[serde(rename = "brokerName")]
    pub name: String,

    #[serde(rename = "brokerEndpoint")]
    pub endpoint: String,

    /// Issued by the broker at registration, used for every later call.
    #[serde(skip_serializing, default = "empty_token")]
    pub auth_token: Secret<String>,

    #[serde(rename = "subscribed")]
    pub enabled: bool,
}

impl BrokerRecord {
    pub fn new(
        id: BrokerId,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            endpoint: endpoint.into(),
            auth_token: Secret::new(auth_token.into()),
            enabled: true,
        }
    }

    pub fn token(&self) -> &str {
        self.auth_token.expose_secret()
    }
}

fn empty_token() -> Secret<String> {
    Secret::new(String::new())
}

/// Body of `POST {endpoint}/authenticate`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticationRequest {
    #[serde(rename = "clusterID")]
    pub cluster_id: String,

    #[serde(rename = "clusterName")]
    pub cluster_name: String,

    pub token: String,

    pub endpoint: String,

    #[serde(rename = "clusterContractEndpoint")]
    pub cluster_contract_endpoint: String,
}

impl AuthenticationRequest {
    pub fn new(parameters: &ClusterParameters, contract_endpoint: impl Into<String>) -> Self {
        Self {
            cluster_id: parameters.cluster_id.clone(),
            cluster_name: parameters.cluster_name.clone(),
            token: parameters.bearer_token().to_string(),
            endpoint: parameters.endpoint.clone(),
            cluster_contract_endpoint: contract_endpoint.into(),
        }
    }
}

/// The broker's answer to an authentication request.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationResponse {
    pub status: String,

    #[serde(rename = "brokerID", default)]
    pub broker_id: String,

    #[serde(default)]
    pub token: String,
}

impl AuthenticationResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}
