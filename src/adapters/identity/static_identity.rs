//! Cluster identity backed by configuration.
//!
//! Credentials are fixed at startup. The pretty name and the contract
//! endpoint may be changed at runtime by the operator.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::ClusterConfig;
use crate::domain::cluster::{ClusterParameters, Provider};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::ClusterIdentity;

#[derive(Debug)]
struct Advertised {
    pretty_name: String,
    contract_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StaticClusterIdentity {
    parameters: ClusterParameters,
    advertised: Arc<RwLock<Advertised>>,
}

impl StaticClusterIdentity {
    pub fn new(
        parameters: ClusterParameters,
        pretty_name: impl Into<String>,
        contract_endpoint: Option<String>,
    ) -> Self {
        Self {
            parameters,
            advertised: Arc::new(RwLock::new(Advertised {
                pretty_name: pretty_name.into(),
                contract_endpoint: contract_endpoint.filter(|e| !e.trim().is_empty()),
            })),
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        let parameters = ClusterParameters {
            cluster_id: config.cluster_id.clone(),
            cluster_name: config.cluster_name.clone(),
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
        };
        Self::new(
            parameters,
            config.pretty_name.clone(),
            config.contract_endpoint.clone(),
        )
    }

    pub async fn set_pretty_name(&self, pretty_name: impl Into<String>) {
        self.advertised.write().await.pretty_name = pretty_name.into();
    }

    pub async fn set_contract_endpoint(&self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        tracing::info!(contract_endpoint = %endpoint, "Contract endpoint updated");
        self.advertised.write().await.contract_endpoint = Some(endpoint);
    }
}

#[async_trait]
impl ClusterIdentity for StaticClusterIdentity {
    async fn local_parameters(&self) -> Result<ClusterParameters, DomainError> {
        Ok(self.parameters.clone())
    }

    async fn contract_endpoint(&self) -> Result<Option<String>, DomainError> {
        Ok(self.advertised.read().await.contract_endpoint.clone())
    }

    async fn local_provider(&self) -> Result<Provider, DomainError> {
        let advertised = self.advertised.read().await;
        let contract_endpoint = advertised.contract_endpoint.clone().ok_or_else(|| {
            DomainError::new(
                ErrorCode::ValidationFailed,
                "cluster contract endpoint is not defined",
            )
        })?;
        Ok(Provider::from_parameters(
            &self.parameters,
            advertised.pretty_name.clone(),
            contract_endpoint,
        ))
    }
}
