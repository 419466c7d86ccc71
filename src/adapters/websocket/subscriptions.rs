//! BrokerSubscriptions - starts and controls broker supervisors.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::offers::OfferSyncEngine;
use crate::domain::broker::{BackoffPolicy, BrokerRecord};
use crate::domain::foundation::BrokerId;
use crate::ports::{BrokerDirectory, BrokerSubscriber, BrokerTransport};

use super::broker_hub::{Attachment, BrokerHub};
use super::supervisor::BrokerSupervisor;

#[derive(Clone)]
pub struct BrokerSubscriptions {
    hub: BrokerHub,
    transport: Arc<dyn BrokerTransport>,
    sync: Arc<OfferSyncEngine>,
    directory: Arc<dyn BrokerDirectory>,
    policy: BackoffPolicy,
}

impl BrokerSubscriptions {
    pub fn new(
        hub: BrokerHub,
        transport: Arc<dyn BrokerTransport>,
        sync: Arc<OfferSyncEngine>,
        directory: Arc<dyn BrokerDirectory>,
        policy: BackoffPolicy,
    ) -> Self {
        Self {
            hub,
            transport,
            sync,
            directory,
            policy,
        }
    }
}

#[async_trait]
impl BrokerSubscriber for BrokerSubscriptions {
    async fn subscribe(&self, broker: BrokerRecord) {
        match self.hub.attach(broker.id.clone()).await {
            Some(Attachment::Fresh(control)) => {
                BrokerSupervisor::new(
                    broker,
                    control,
                    Arc::clone(&self.transport),
                    self.hub.clone(),
                    Arc::clone(&self.sync),
                    Arc::clone(&self.directory),
                    self.policy,
                )
                .spawn();
            }
            Some(Attachment::Resumed { resync: true }) => {
                tracing::debug!(broker_id = %broker.id, "Resumed open session, pushing offers");
                if let Err(err) = self.sync.selective_sync(&broker.id).await {
                    tracing::warn!(broker_id = %broker.id, error = %err, "Offer push after resume incomplete");
                }
            }
            Some(Attachment::Resumed { resync: false }) => {
                tracing::debug!(broker_id = %broker.id, "Supervisor already running");
            }
            None => tracing::warn!(broker_id = %broker.id, "Broker hub stopped, not subscribing"),
        }
    }

    async fn unsubscribe(&self, broker_id: &BrokerId) {
        self.hub.unsubscribe(broker_id.clone());
    }

    async fn stop(&self, broker_id: &BrokerId) {
        self.hub.unregister(broker_id.clone());
    }
}
