//! BrokerRegistry - broker relationships of the local cluster.
//!
//! Registration authenticates against the broker and stores the token it
//! hands back; every later call and the live session use that token.
//! Removal first clears what the broker holds for this cluster, so a failed
//! clear leaves the relationship in place.

use std::sync::Arc;

use thiserror::Error;

use crate::application::offers::{OfferSyncEngine, SyncError};
use crate::domain::broker::{AuthenticationRequest, BrokerRecord};
use crate::domain::foundation::{BrokerId, DomainError, ErrorCode, ValidationError};
use crate::ports::{BrokerDirectory, BrokerGateway, BrokerSubscriber, ClusterIdentity, RemoteError};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("contract endpoint is not defined for this cluster")]
    ContractEndpointUndefined,

    #[error("broker at {0} is already registered")]
    AlreadyRegistered(String),

    #[error("broker at {endpoint} refused registration with status {status}")]
    Refused { endpoint: String, status: String },

    #[error("broker returned an invalid id: {0}")]
    InvalidBrokerId(#[from] ValidationError),

    #[error("broker {0} not found")]
    NotFound(BrokerId),

    #[error("authentication failed: {0}")]
    Authentication(#[from] RemoteError),

    #[error("could not clear broker offers: {0}")]
    Sync(SyncError),

    #[error("cluster identity unavailable: {0}")]
    Identity(DomainError),

    #[error("broker store failure: {0}")]
    Store(DomainError),
}

impl BrokerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BrokerError::MissingParameter(_) => ErrorCode::EmptyField,
            BrokerError::ContractEndpointUndefined => ErrorCode::ValidationFailed,
            BrokerError::AlreadyRegistered(_) => ErrorCode::BrokerAlreadyRegistered,
            BrokerError::Refused { .. } | BrokerError::Authentication(_) => ErrorCode::RemoteError,
            BrokerError::InvalidBrokerId(_) => ErrorCode::InvalidFormat,
            BrokerError::NotFound(_) => ErrorCode::BrokerNotFound,
            BrokerError::Sync(err) => err.code(),
            BrokerError::Identity(err) | BrokerError::Store(err) => err.code,
        }
    }
}

impl From<DomainError> for BrokerError {
    fn from(err: DomainError) -> Self {
        BrokerError::Store(err)
    }
}

pub struct BrokerRegistry {
    directory: Arc<dyn BrokerDirectory>,
    gateway: Arc<dyn BrokerGateway>,
    identity: Arc<dyn ClusterIdentity>,
    subscriber: Arc<dyn BrokerSubscriber>,
    sync: Arc<OfferSyncEngine>,
}

impl BrokerRegistry {
    pub fn new(
        directory: Arc<dyn BrokerDirectory>,
        gateway: Arc<dyn BrokerGateway>,
        identity: Arc<dyn ClusterIdentity>,
        subscriber: Arc<dyn BrokerSubscriber>,
        sync: Arc<OfferSyncEngine>,
    ) -> Self {
        Self {
            directory,
            gateway,
            identity,
            subscriber,
            sync,
        }
    }

    /// Registers with the broker at `endpoint` and starts its supervisor.
    pub async fn register(&self, name: &str, endpoint: &str) -> Result<BrokerId, BrokerError> {
        if name.trim().is_empty() {
            return Err(BrokerError::MissingParameter("brokerName"));
        }
        if endpoint.trim().is_empty() {
            return Err(BrokerError::MissingParameter("brokerEndpoint"));
        }
        let contract_endpoint = self
            .identity
            .contract_endpoint()
            .await
            .map_err(BrokerError::Identity)?
            .ok_or(BrokerError::ContractEndpointUndefined)?;
        if self.directory.find_broker_by_endpoint(endpoint).await?.is_some() {
            return Err(BrokerError::AlreadyRegistered(endpoint.to_string()));
        }

        let parameters = self
            .identity
            .local_parameters()
            .await
            .map_err(BrokerError::Identity)?;
        let request = AuthenticationRequest::new(&parameters, contract_endpoint);
        let response = self.gateway.authenticate(endpoint, &request).await?;
        if !response.is_ok() {
            tracing::warn!(endpoint, status = %response.status, "Broker refused registration");
            return Err(BrokerError::Refused {
                endpoint: endpoint.to_string(),
                status: response.status,
            });
        }

        let id = BrokerId::new(response.broker_id)?;
        let record = BrokerRecord::new(id.clone(), name, endpoint, response.token);
        self.directory.upsert_broker(&record).await?;
        tracing::info!(broker_id = %id, endpoint, "Broker registered");

        self.subscriber.subscribe(record).await;
        Ok(id)
    }

    /// Clears the broker's offers, stops its supervisor and forgets it.
    pub async fn remove(&self, id: &BrokerId) -> Result<(), BrokerError> {
        self.sync
            .selective_delete_sync(id)
            .await
            .map_err(|err| match err {
                SyncError::BrokerNotFound(id) => BrokerError::NotFound(id),
                other => BrokerError::Sync(other),
            })?;

        self.subscriber.stop(id).await;
        self.directory.delete_broker(id).await?;
        tracing::info!(broker_id = %id, "Broker removed");
        Ok(())
    }

    /// Pauses or resumes the live session with a broker.
    pub async fn set_subscription(&self, id: &BrokerId, enabled: bool) -> Result<(), BrokerError> {
        if !self.directory.set_broker_enabled(id, enabled).await? {
            return Err(BrokerError::NotFound(id.clone()));
        }

        if enabled {
            let record = self
                .directory
                .get_broker(id)
                .await?
                .ok_or_else(|| BrokerError::NotFound(id.clone()))?;
            self.subscriber.subscribe(record).await;
        } else {
            self.subscriber.unsubscribe(id).await;
        }
        tracing::info!(broker_id = %id, enabled, "Broker subscription changed");
        Ok(())
    }

    /// Starts supervisors for every stored enabled broker. Returns how many.
    pub async fn resume_all(&self) -> Result<usize, BrokerError> {
        let brokers = self.directory.list_brokers().await?;
        let mut resumed = 0;
        for broker in brokers.into_iter().filter(|b| b.enabled) {
            self.subscriber.subscribe(broker).await;
            resumed += 1;
        }
        tracing::info!(resumed, "Stored brokers resumed");
        Ok(resumed)
    }

    pub async fn brokers(&self) -> Result<Vec<BrokerRecord>, BrokerError> {
        Ok(self.directory.list_brokers().await?)
    }
}
