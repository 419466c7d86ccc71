//! OfferCatalog - local catalog administration.
//!
//! Local offer changes are written to the store first and then pushed to
//! the brokers. A failed push never fails the local change; the next sync
//! repairs it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time;

use crate::domain::catalog::{Catalog, Offer};
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use crate::ports::{BrokerDirectory, BrokerGateway, CatalogStore};

use super::sync_engine::OfferSyncEngine;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid offer: {0}")]
    Validation(#[from] ValidationError),

    #[error("offer {0} not found")]
    OfferNotFound(String),

    #[error("catalog store failure: {0}")]
    Store(#[from] DomainError),
}

impl CatalogError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CatalogError::Validation(_) => ErrorCode::ValidationFailed,
            CatalogError::OfferNotFound(_) => ErrorCode::OfferNotFound,
            CatalogError::Store(err) => err.code,
        }
    }
}

pub struct OfferCatalog {
    catalog: Arc<dyn CatalogStore>,
    directory: Arc<dyn BrokerDirectory>,
    gateway: Arc<dyn BrokerGateway>,
    sync: Arc<OfferSyncEngine>,
    broker_timeout: Duration,
}

impl OfferCatalog {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        directory: Arc<dyn BrokerDirectory>,
        gateway: Arc<dyn BrokerGateway>,
        sync: Arc<OfferSyncEngine>,
        broker_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            directory,
            gateway,
            sync,
            broker_timeout,
        }
    }

    /// Creates or updates an offer and pushes it to the brokers.
    pub async fn publish(&self, offer: Offer) -> Result<(), CatalogError> {
        offer.validate()?;
        self.catalog.upsert_offer(&offer).await?;
        tracing::info!(offer_id = %offer.offer_id, "Offer published");

        if let Err(err) = self.sync.sync_single_offer(&offer.offer_id, false).await {
            tracing::warn!(offer_id = %offer.offer_id, error = %err, "Offer push incomplete");
        }
        Ok(())
    }

    /// Deletes an offer and withdraws it from the brokers.
    pub async fn withdraw(&self, offer_id: &str) -> Result<(), CatalogError> {
        if !self.catalog.delete_offer(offer_id).await? {
            return Err(CatalogError::OfferNotFound(offer_id.to_string()));
        }
        tracing::info!(offer_id, "Offer withdrawn");

        if let Err(err) = self.sync.sync_single_offer(offer_id, true).await {
            tracing::warn!(offer_id, error = %err, "Offer withdrawal incomplete");
        }
        Ok(())
    }

    /// Catalogs listed by every enabled broker.
    ///
    /// Brokers that fail or time out are skipped.
    pub async fn remote_catalogs(&self) -> Result<Vec<Catalog>, CatalogError> {
        let brokers = self.directory.list_brokers().await?;
        let mut catalogs = Vec::new();

        for broker in brokers.iter().filter(|b| b.enabled) {
            let api = self.gateway.client_for(broker);
            match time::timeout(self.broker_timeout, api.get_catalog()).await {
                Ok(Ok(listed)) => catalogs.extend(listed),
                Ok(Err(err)) => {
                    tracing::warn!(broker_id = %broker.id, error = %err, "Skipping broker catalog");
                }
                Err(_) => {
                    tracing::warn!(broker_id = %broker.id, "Broker catalog timed out");
                }
            }
        }

        Ok(catalogs)
    }
}
