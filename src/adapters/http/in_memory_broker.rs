//! In-memory broker gateway for testing.
//!
//! Simulates any number of brokers keyed by endpoint. Each broker holds the
//! offers pushed to it, answers catalog and authentication requests from
//! configured data, and journals every call for verification.
//!
//! # Features
//!
//! - Per-broker offer state keyed by offer id
//! - Error injection (`fail`) and hung brokers (`stall`)
//! - Call tracking, including calls that failed

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::broker::{AuthenticationRequest, AuthenticationResponse, BrokerRecord};
use crate::domain::catalog::{Catalog, Offer};
use crate::ports::{BrokerGateway, RemoteBrokerApi, RemoteError};

/// One call received by a simulated broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCall {
    Authenticate,
    GetCatalog,
    PostOffer(String),
    BulkPost(Vec<String>),
    DeleteOffer(String),
    DeleteAll,
}

#[derive(Debug, Default)]
struct SimulatedBroker {
    offers: BTreeMap<String, Offer>,
    catalogs: Vec<Catalog>,
    registration: Option<AuthenticationResponse>,
    calls: Vec<BrokerCall>,
    failing: bool,
    stalled: bool,
}

type Brokers = Arc<RwLock<HashMap<String, SimulatedBroker>>>;

/// Gateway to simulated brokers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBrokerGateway {
    brokers: Brokers,
}

impl InMemoryBrokerGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the broker at `endpoint` accept registrations with the given id.
    pub async fn accept_registration(&self, endpoint: &str, broker_id: &str, token: &str) {
        self.with_broker(endpoint, |b| {
            b.registration = Some(AuthenticationResponse {
                status: "OK".to_string(),
                broker_id: broker_id.to_string(),
                token: token.to_string(),
            })
        })
        .await;
    }

    /// Makes the broker at `endpoint` answer registrations with a non-OK status.
    pub async fn refuse_registration(&self, endpoint: &str) {
        self.with_broker(endpoint, |b| {
            b.registration = Some(AuthenticationResponse {
                status: "KO".to_string(),
                broker_id: String::new(),
                token: String::new(),
            })
        })
        .await;
    }

    pub async fn set_catalogs(&self, endpoint: &str, catalogs: Vec<Catalog>) {
        self.with_broker(endpoint, |b| b.catalogs = catalogs).await;
    }

    /// Places an offer at a broker without journaling a call.
    pub async fn seed_offer(&self, endpoint: &str, offer: Offer) {
        self.with_broker(endpoint, |b| {
            b.offers.insert(offer.offer_id.clone(), offer);
        })
        .await;
    }

    /// Every following call to the broker fails with HTTP 503.
    pub async fn fail(&self, endpoint: &str) {
        self.with_broker(endpoint, |b| b.failing = true).await;
    }

    /// Every following call to the broker never completes.
    pub async fn stall(&self, endpoint: &str) {
        self.with_broker(endpoint, |b| b.stalled = true).await;
    }

    pub async fn recover(&self, endpoint: &str) {
        self.with_broker(endpoint, |b| {
            b.failing = false;
            b.stalled = false;
        })
        .await;
    }

    /// Ids of the offers held by the broker, sorted.
    pub async fn offers_held(&self, endpoint: &str) -> Vec<String> {
        self.brokers
            .read()
            .await
            .get(endpoint)
            .map(|b| b.offers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Calls the broker received, in order.
    pub async fn calls(&self, endpoint: &str) -> Vec<BrokerCall> {
        self.brokers
            .read()
            .await
            .get(endpoint)
            .map(|b| b.calls.clone())
            .unwrap_or_default()
    }

    async fn with_broker<F>(&self, endpoint: &str, f: F)
    where
        F: FnOnce(&mut SimulatedBroker),
    {
        let mut brokers = self.brokers.write().await;
        f(brokers.entry(endpoint.to_string()).or_default());
    }
}

/// Journals the call, then applies the injected behaviour of the broker.
async fn receive(brokers: &Brokers, endpoint: &str, call: BrokerCall) -> Result<(), RemoteError> {
    let (failing, stalled) = {
        let mut brokers = brokers.write().await;
        let broker = brokers.entry(endpoint.to_string()).or_default();
        broker.calls.push(call);
        (broker.failing, broker.stalled)
    };

    if stalled {
        std::future::pending::<()>().await;
    }
    if failing {
        return Err(RemoteError::unexpected_status(
            endpoint,
            503,
            r#"{"error":"broker unavailable"}"#,
        ));
    }
    Ok(())
}

#[async_trait]
impl BrokerGateway for InMemoryBrokerGateway {
    async fn authenticate(
        &self,
        endpoint: &str,
        _request: &AuthenticationRequest,
    ) -> Result<AuthenticationResponse, RemoteError> {
        receive(&self.brokers, endpoint, BrokerCall::Authenticate).await?;
        self.brokers
            .read()
            .await
            .get(endpoint)
            .and_then(|b| b.registration.clone())
            .ok_or_else(|| RemoteError::transport(endpoint, "connection refused"))
    }

    fn client_for(&self, broker: &BrokerRecord) -> Arc<dyn RemoteBrokerApi> {
        Arc::new(InMemoryBrokerClient {
            endpoint: broker.endpoint.clone(),
            brokers: Arc::clone(&self.brokers),
        })
    }
}

struct InMemoryBrokerClient {
    endpoint: String,
    brokers: Brokers,
}

impl InMemoryBrokerClient {
    async fn apply<F>(&self, f: F)
    where
        F: FnOnce(&mut SimulatedBroker),
    {
        let mut brokers = self.brokers.write().await;
        f(brokers.entry(self.endpoint.clone()).or_default());
    }
}

#[async_trait]
impl RemoteBrokerApi for InMemoryBrokerClient {
    async fn get_catalog(&self) -> Result<Vec<Catalog>, RemoteError> {
        receive(&self.brokers, &self.endpoint, BrokerCall::GetCatalog).await?;
        Ok(self
            .brokers
            .read()
            .await
            .get(&self.endpoint)
            .map(|b| b.catalogs.clone())
            .unwrap_or_default())
    }

    async fn post_offer(&self, offer: &Offer) -> Result<(), RemoteError> {
        receive(
            &self.brokers,
            &self.endpoint,
            BrokerCall::PostOffer(offer.offer_id.clone()),
        )
        .await?;
        self.apply(|b| {
            b.offers.insert(offer.offer_id.clone(), offer.clone());
        })
        .await;
        Ok(())
    }

    async fn bulk_post_offers(&self, offers: &[Offer]) -> Result<(), RemoteError> {
        let ids = offers.iter().map(|o| o.offer_id.clone()).collect();
        receive(&self.brokers, &self.endpoint, BrokerCall::BulkPost(ids)).await?;
        self.apply(|b| {
            for offer in offers {
                b.offers.insert(offer.offer_id.clone(), offer.clone());
            }
        })
        .await;
        Ok(())
    }

    async fn delete_offer(&self, offer_id: &str) -> Result<(), RemoteError> {
        receive(
            &self.brokers,
            &self.endpoint,
            BrokerCall::DeleteOffer(offer_id.to_string()),
        )
        .await?;
        self.apply(|b| {
            b.offers.remove(offer_id);
        })
        .await;
        Ok(())
    }

    async fn delete_all_offers(&self) -> Result<(), RemoteError> {
        receive(&self.brokers, &self.endpoint, BrokerCall::DeleteAll).await?;
        self.apply(|b| b.offers.clear()).await;
        Ok(())
    }
}
