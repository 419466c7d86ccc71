//! OfferSyncEngine - reconciles broker-side catalogs with the local one.
//!
//! Every push is idempotent at the broker (create/update and delete are
//! keyed by offer id), so repeated syncs converge. Nothing is atomic across
//! brokers or offers: brokers are visited one after the other, each bounded
//! by a timeout, and a failing broker never stops the others.
//!
//! | Operation | Brokers | Broker calls |
//! |-----------|---------|--------------|
//! | `sync_single_offer` | enabled | one POST or one DELETE |
//! | `full_sync` | enabled | bulk POST |
//! | `clean_sync` | enabled | DELETE all, bulk POST |
//! | `selective_sync` | one, if enabled | POST per offer |
//! | `selective_clean_sync` | one, if enabled | DELETE all, POST per offer |
//! | `selective_delete_sync` | one | DELETE all |

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time;

use crate::domain::broker::BrokerRecord;
use crate::domain::catalog::Offer;
use crate::domain::foundation::{BrokerId, DomainError, ErrorCode};
use crate::ports::{BrokerDirectory, BrokerGateway, CatalogStore, RemoteError};

/// One broker that could not be brought in line.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerFailure {
    pub broker_id: BrokerId,
    pub error: RemoteError,
}

/// Outcome of a sync over one or more brokers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub synced: Vec<BrokerId>,
    pub failures: Vec<BrokerFailure>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("catalog store failure: {0}")]
    Store(#[from] DomainError),

    #[error("offer {0} not found")]
    OfferNotFound(String),

    #[error("broker {0} not found")]
    BrokerNotFound(BrokerId),

    #[error("sync failed for {} of {} brokers", .0.failures.len(), .0.failures.len() + .0.synced.len())]
    Incomplete(SyncReport),
}

impl SyncError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SyncError::Store(err) => err.code,
            SyncError::OfferNotFound(_) => ErrorCode::OfferNotFound,
            SyncError::BrokerNotFound(_) => ErrorCode::BrokerNotFound,
            SyncError::Incomplete(_) => ErrorCode::RemoteError,
        }
    }
}

enum Step<'a> {
    Post(&'a Offer),
    BulkPost(&'a [Offer]),
    Delete(&'a str),
    DeleteAll,
}

/// Pushes local catalog changes to brokers.
pub struct OfferSyncEngine {
    catalog: Arc<dyn CatalogStore>,
    directory: Arc<dyn BrokerDirectory>,
    gateway: Arc<dyn BrokerGateway>,
    broker_timeout: Duration,
}

impl OfferSyncEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        directory: Arc<dyn BrokerDirectory>,
        gateway: Arc<dyn BrokerGateway>,
        broker_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            directory,
            gateway,
            broker_timeout,
        }
    }

    /// Pushes one offer, or its deletion, to every enabled broker.
    pub async fn sync_single_offer(
        &self,
        offer_id: &str,
        deleted: bool,
    ) -> Result<SyncReport, SyncError> {
        let offer = if deleted {
            None
        } else {
            let offer = self
                .catalog
                .get_offer(offer_id)
                .await?
                .ok_or_else(|| SyncError::OfferNotFound(offer_id.to_string()))?;
            Some(offer)
        };
        let step = match &offer {
            Some(offer) => Step::Post(offer),
            None => Step::Delete(offer_id),
        };
        let brokers = self.enabled_brokers().await?;
        let report = self.push_to_all(&brokers, &[step]).await;
        tracing::debug!(offer_id, deleted, brokers = brokers.len(), "Single offer sync finished");
        finish(report)
    }

    /// Posts every local offer to every enabled broker.
    pub async fn full_sync(&self) -> Result<SyncReport, SyncError> {
        let offers = self.catalog.list_offers().await?;
        let brokers = self.enabled_brokers().await?;
        let report = self.push_to_all(&brokers, &[Step::BulkPost(&offers)]).await;
        tracing::info!(offers = offers.len(), brokers = brokers.len(), "Full sync finished");
        finish(report)
    }

    /// Clears and repopulates every enabled broker.
    ///
    /// Not atomic: a broker may hold no offers between the two calls.
    pub async fn clean_sync(&self) -> Result<SyncReport, SyncError> {
        let offers = self.catalog.list_offers().await?;
        let brokers = self.enabled_brokers().await?;
        let report = self
            .push_to_all(&brokers, &[Step::DeleteAll, Step::BulkPost(&offers)])
            .await;
        tracing::info!(offers = offers.len(), brokers = brokers.len(), "Clean sync finished");
        finish(report)
    }

    /// Posts every local offer to one broker. A paused broker is skipped.
    pub async fn selective_sync(&self, broker_id: &BrokerId) -> Result<SyncReport, SyncError> {
        let broker = self.broker(broker_id).await?;
        if !broker.enabled {
            tracing::debug!(broker_id = %broker_id, "Skipping sync to paused broker");
            return Ok(SyncReport::default());
        }
        let offers = self.catalog.list_offers().await?;
        let steps: Vec<Step<'_>> = offers.iter().map(Step::Post).collect();
        finish(self.push_to_all(std::slice::from_ref(&broker), &steps).await)
    }

    /// Clears one broker, then posts every local offer to it.
    pub async fn selective_clean_sync(
        &self,
        broker_id: &BrokerId,
    ) -> Result<SyncReport, SyncError> {
        let broker = self.broker(broker_id).await?;
        if !broker.enabled {
            tracing::debug!(broker_id = %broker_id, "Skipping clean sync to paused broker");
            return Ok(SyncReport::default());
        }
        let offers = self.catalog.list_offers().await?;
        let steps: Vec<Step<'_>> = std::iter::once(Step::DeleteAll)
            .chain(offers.iter().map(Step::Post))
            .collect();
        finish(self.push_to_all(std::slice::from_ref(&broker), &steps).await)
    }

    /// Deletes every offer one broker holds for this cluster, paused or not.
    pub async fn selective_delete_sync(
        &self,
        broker_id: &BrokerId,
    ) -> Result<SyncReport, SyncError> {
        let broker = self.broker(broker_id).await?;
        finish(
            self.push_to_all(std::slice::from_ref(&broker), &[Step::DeleteAll])
                .await,
        )
    }

    async fn broker(&self, broker_id: &BrokerId) -> Result<BrokerRecord, SyncError> {
        self.directory
            .get_broker(broker_id)
            .await?
            .ok_or_else(|| SyncError::BrokerNotFound(broker_id.clone()))
    }

    async fn enabled_brokers(&self) -> Result<Vec<BrokerRecord>, SyncError> {
        let brokers = self.directory.list_brokers().await?;
        Ok(brokers.into_iter().filter(|b| b.enabled).collect())
    }

    async fn push_to_all(&self, brokers: &[BrokerRecord], steps: &[Step<'_>]) -> SyncReport {
        let mut report = SyncReport::default();
        for broker in brokers {
            match self.push(broker, steps).await {
                Ok(()) => report.synced.push(broker.id.clone()),
                Err(error) => {
                    tracing::warn!(broker_id = %broker.id, error = %error, "Broker sync failed");
                    report.failures.push(BrokerFailure {
                        broker_id: broker.id.clone(),
                        error,
                    });
                }
            }
        }
        report
    }

    /// Runs the steps against one broker, stopping at the first failure.
    async fn push(&self, broker: &BrokerRecord, steps: &[Step<'_>]) -> Result<(), RemoteError> {
        let api = self.gateway.client_for(broker);
        let sequence = async {
            for step in steps {
                match step {
                    Step::Post(offer) => api.post_offer(offer).await?,
                    Step::BulkPost(offers) => api.bulk_post_offers(offers).await?,
                    Step::Delete(offer_id) => api.delete_offer(offer_id).await?,
                    Step::DeleteAll => api.delete_all_offers().await?,
                }
            }
            Ok::<(), RemoteError>(())
        };

        time::timeout(self.broker_timeout, sequence)
            .await
            .map_err(|_| RemoteError::Timeout {
                endpoint: broker.endpoint.clone(),
                secs: self.broker_timeout.as_secs(),
            })?
    }
}

fn finish(report: SyncReport) -> Result<SyncReport, SyncError> {
    if report.is_complete() {
        Ok(report)
    } else {
        Err(SyncError::Incomplete(report))
    }
}
