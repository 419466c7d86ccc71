//! Integration tests for the marketplace connector.
//!
//! These tests drive the public services end to end:
//! 1. Broker registration starts a supervisor that connects and pushes offers
//! 2. Broker frames reach local subscribers through both hubs
//! 3. Unreachable brokers are abandoned and forgotten exactly once
//! 4. Offer changes and reconciliation converge broker-side state
//! 5. Contracts are bought, sold and aggregated without duplicates
//!
//! Uses the in-memory store, broker gateway, seller gateway and transport.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;

use catalog_connector::adapters::http::{BrokerCall, InMemoryBrokerGateway, InMemorySellerGateway};
use catalog_connector::adapters::identity::StaticClusterIdentity;
use catalog_connector::adapters::storage::InMemoryStore;
use catalog_connector::adapters::websocket::{
    BrokerHub, BrokerSubscriptions, ClientHub, ClientSession, HubSnapshot, InMemoryBrokerTransport,
    Message, MessageEvent,
};
use catalog_connector::application::{
    BrokerRegistry, BuyContractCommand, ContractError, ContractNegotiator, OfferCatalog,
    OfferSyncEngine, SellContractCommand,
};
use catalog_connector::domain::broker::{BackoffPolicy, BrokerRecord};
use catalog_connector::domain::catalog::{Offer, Plan};
use catalog_connector::domain::cluster::{ClusterParameters, Provider};
use catalog_connector::domain::foundation::{BrokerId, ErrorCode};
use catalog_connector::ports::{BrokerDirectory, CatalogStore};

// =============================================================================
// Test Infrastructure
// =============================================================================

const WAIT: Duration = Duration::from_secs(2);
const BROKER: &str = "http://broker.example";

struct Connector {
    store: InMemoryStore,
    gateway: InMemoryBrokerGateway,
    transport: InMemoryBrokerTransport,
    clients: ClientHub,
    broker_hub: BrokerHub,
    dashboard: mpsc::Receiver<Message>,
    sync: Arc<OfferSyncEngine>,
    registry: BrokerRegistry,
    catalog: OfferCatalog,
}

async fn connector() -> Connector {
    let store = InMemoryStore::new();
    let gateway = InMemoryBrokerGateway::new();
    let transport = InMemoryBrokerTransport::new();
    let identity = Arc::new(StaticClusterIdentity::new(
        ClusterParameters::new("alpha", "alpha", "http://alpha", "alpha-token"),
        "Alpha",
        Some("http://alpha/contracts".to_string()),
    ));

    let clients = ClientHub::spawn(None);
    let (dashboard_session, dashboard) = ClientSession::channel("dashboard", 256);
    clients.register(dashboard_session);
    clients.session_count().await;
    let broker_hub = BrokerHub::spawn(clients.clone());

    let sync = Arc::new(OfferSyncEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(gateway.clone()),
        Duration::from_secs(1),
    ));
    let subscriptions = Arc::new(BrokerSubscriptions::new(
        broker_hub.clone(),
        Arc::new(transport.clone()),
        Arc::clone(&sync),
        Arc::new(store.clone()),
        BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(8)),
    ));
    let registry = BrokerRegistry::new(
        Arc::new(store.clone()),
        Arc::new(gateway.clone()),
        identity,
        subscriptions,
        Arc::clone(&sync),
    );
    let catalog = OfferCatalog::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(gateway.clone()),
        Arc::clone(&sync),
        Duration::from_secs(1),
    );

    Connector {
        store,
        gateway,
        transport,
        clients,
        broker_hub,
        dashboard,
        sync,
        registry,
        catalog,
    }
}

impl Connector {
    async fn register(&self, broker_id: &str) -> BrokerId {
        self.gateway
            .accept_registration(BROKER, broker_id, "issued-token")
            .await;
        self.registry.register("main", BROKER).await.unwrap()
    }

    async fn offer_calls(&self) -> Vec<BrokerCall> {
        self.gateway
            .calls(BROKER)
            .await
            .into_iter()
            .filter(|call| *call != BrokerCall::Authenticate)
            .collect()
    }

    async fn settle(&self) {
        self.broker_hub.snapshot().await;
        self.clients.session_count().await;
    }

    fn drain(&mut self) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(msg) = self.dashboard.try_recv() {
            out.push(msg);
        }
        out
    }
}

async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = time::Instant::now() + WAIT;
    while time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        time::sleep(Duration::from_millis(5)).await;
    }
    false
}

fn resources(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn offer(id: &str) -> Offer {
    Offer::new(id, id, vec![Plan::new("basic", resources(&[("cpu", "1")]))])
}

// =============================================================================
// Broker Sessions
// =============================================================================

#[tokio::test]
async fn registered_broker_receives_every_local_offer_on_connect() {
    let c = &connector().await;
    c.store.upsert_offer(&offer("o1")).await.unwrap();
    c.store.upsert_offer(&offer("o2")).await.unwrap();

    let broker_id = c.register("b1").await;

    assert!(c.transport.wait_connected(&broker_id, WAIT).await);
    assert!(eventually(|| async move { c.offer_calls().await.len() >= 2 }).await);
    assert_eq!(
        c.offer_calls().await,
        vec![
            BrokerCall::PostOffer("o1".to_string()),
            BrokerCall::PostOffer("o2".to_string()),
        ]
    );
    assert_eq!(c.gateway.offers_held(BROKER).await, vec!["o1", "o2"]);
}

#[tokio::test]
async fn broker_frames_reach_local_subscribers() {
    let mut c = connector().await;
    let broker_id = c.register("b1").await;
    assert!(c.transport.wait_connected(&broker_id, WAIT).await);

    assert!(c.transport.push(&broker_id, r#"{"catalog":"changed"}"#).await);

    let forwarded = loop {
        let msg = time::timeout(WAIT, c.dashboard.recv())
            .await
            .unwrap()
            .unwrap();
        if msg.event() == MessageEvent::Data {
            break msg;
        }
    };
    assert_eq!(forwarded.data(), r#"{"catalog":"changed"}"#);
    c.drain();
}

#[tokio::test]
async fn unreachable_broker_is_removed_with_a_single_notice() {
    let mut c = connector().await;
    let broker_id = BrokerId::new("b1").unwrap();
    c.transport.always_fail(&broker_id).await;

    c.register("b1").await;

    let store = &c.store;
    let id = &broker_id;
    assert!(eventually(|| async move { store.get_broker(id).await.unwrap().is_none() }).await);
    c.settle().await;
    let notices = c
        .drain()
        .into_iter()
        .filter(|m| m.data() == "Broker Disconnected...b1")
        .count();
    assert_eq!(notices, 1);
    assert!(c.broker_hub.snapshot().await.supervised.is_empty());
}

#[tokio::test]
async fn removing_a_broker_clears_its_offers_and_closes_the_session() {
    let c = &connector().await;
    c.store.upsert_offer(&offer("o1")).await.unwrap();
    let broker_id = c.register("b1").await;
    assert!(c.transport.wait_connected(&broker_id, WAIT).await);
    assert!(eventually(|| async move { !c.gateway.offers_held(BROKER).await.is_empty() }).await);

    c.registry.remove(&broker_id).await.unwrap();

    assert!(c.gateway.offers_held(BROKER).await.is_empty());
    assert!(c.offer_calls().await.contains(&BrokerCall::DeleteAll));
    let id = &broker_id;
    assert!(eventually(|| async move { !c.transport.is_connected(id).await }).await);
    assert!(c.store.get_broker(&broker_id).await.unwrap().is_none());
}

#[tokio::test]
async fn paused_broker_is_skipped_until_resumed() {
    let c = &connector().await;
    let broker_id = c.register("b1").await;
    assert!(c.transport.wait_connected(&broker_id, WAIT).await);

    c.registry.set_subscription(&broker_id, false).await.unwrap();
    c.catalog.publish(offer("o1")).await.unwrap();
    assert!(c.gateway.offers_held(BROKER).await.is_empty());

    c.registry.set_subscription(&broker_id, true).await.unwrap();

    assert!(eventually(|| async move { c.gateway.offers_held(BROKER).await == vec!["o1"] }).await);
    assert!(c.transport.is_connected(&broker_id).await);
    assert_eq!(c.transport.connect_attempts(&broker_id).await, 1);
}

#[tokio::test]
async fn removal_during_connect_leaves_nothing_behind() {
    let mut c = connector().await;
    c.store.upsert_offer(&offer("o1")).await.unwrap();
    let broker_id = BrokerId::new("b1").unwrap();
    c.transport
        .delay_connect(&broker_id, Duration::from_millis(100))
        .await;
    c.register("b1").await;
    let (transport, id) = (&c.transport, &broker_id);
    assert!(eventually(|| async move { transport.connect_attempts(id).await == 1 }).await);

    c.registry.remove(&broker_id).await.unwrap();
    time::sleep(Duration::from_millis(200)).await;
    c.settle().await;

    assert_eq!(c.offer_calls().await, vec![BrokerCall::DeleteAll]);
    assert!(c.gateway.offers_held(BROKER).await.is_empty());
    assert!(!c.transport.is_connected(&broker_id).await);
    assert_eq!(c.broker_hub.snapshot().await, HubSnapshot::default());
    assert!(!c
        .drain()
        .iter()
        .any(|m| m.data() == "New Broker Joined...http://broker.example"));
}

// =============================================================================
// Offer Synchronization
// =============================================================================

async fn broker_without_session(c: &Connector) -> BrokerRecord {
    let broker = BrokerRecord::new(BrokerId::new("b1").unwrap(), "main", BROKER, "t");
    c.store.upsert_broker(&broker).await.unwrap();
    broker
}

#[tokio::test]
async fn clean_then_full_sync_converge_on_the_local_catalog() {
    let c = connector().await;
    broker_without_session(&c).await;
    c.gateway.seed_offer(BROKER, offer("stale")).await;
    c.store.upsert_offer(&offer("o1")).await.unwrap();
    c.store.upsert_offer(&offer("o2")).await.unwrap();

    c.sync.clean_sync().await.unwrap();
    assert_eq!(c.gateway.offers_held(BROKER).await, vec!["o1", "o2"]);

    c.sync.full_sync().await.unwrap();
    assert_eq!(c.gateway.offers_held(BROKER).await, vec!["o1", "o2"]);
}

#[tokio::test]
async fn publish_then_withdraw_leaves_nothing_at_the_broker() {
    let c = connector().await;
    broker_without_session(&c).await;

    c.catalog.publish(offer("o1")).await.unwrap();
    assert_eq!(c.gateway.offers_held(BROKER).await, vec!["o1"]);

    c.catalog.withdraw("o1").await.unwrap();

    assert!(c.gateway.offers_held(BROKER).await.is_empty());
    assert_eq!(
        c.offer_calls().await,
        vec![
            BrokerCall::PostOffer("o1".to_string()),
            BrokerCall::DeleteOffer("o1".to_string()),
        ]
    );
}

#[tokio::test]
async fn failing_broker_does_not_block_the_others() {
    let c = connector().await;
    broker_without_session(&c).await;
    let healthy = BrokerRecord::new(
        BrokerId::new("b2").unwrap(),
        "backup",
        "http://backup.example",
        "t",
    );
    c.store.upsert_broker(&healthy).await.unwrap();
    c.store.upsert_offer(&offer("o1")).await.unwrap();
    c.gateway.fail(BROKER).await;

    let err = c.sync.full_sync().await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::RemoteError);
    assert_eq!(
        c.gateway.offers_held("http://backup.example").await,
        vec!["o1"]
    );
}

// =============================================================================
// Contracts
// =============================================================================

fn beta() -> Provider {
    Provider {
        cluster_id: "beta".to_string(),
        cluster_name: "beta".to_string(),
        endpoint: "http://beta".to_string(),
        cluster_pretty_name: "Beta".to_string(),
        cluster_contract_endpoint: "http://beta/contracts".to_string(),
    }
}

fn negotiator(store: &InMemoryStore, sellers: &InMemorySellerGateway) -> ContractNegotiator {
    ContractNegotiator::new(
        Arc::new(store.clone()),
        Arc::new(StaticClusterIdentity::new(
            ClusterParameters::new("alpha", "alpha", "http://alpha", "alpha-token"),
            "Alpha",
            Some("http://alpha/contracts".to_string()),
        )),
        Arc::new(sellers.clone()),
    )
}

#[tokio::test]
async fn bought_plans_aggregate_into_one_resource_list() {
    let store = InMemoryStore::new();
    let sellers = InMemorySellerGateway::new();
    sellers
        .list_offer(
            &beta(),
            Offer::new(
                "compute",
                "compute",
                vec![
                    Plan::new("large", resources(&[("cpu", "2"), ("memory", "4Gi")])),
                    Plan::new("small", resources(&[("cpu", "1"), ("memory", "1Gi")])),
                ],
            ),
        )
        .await;
    let negotiator = negotiator(&store, &sellers);

    for plan in ["large", "small"] {
        negotiator
            .buy(BuyContractCommand {
                buyer_id: "alpha".to_string(),
                offer_id: "compute".to_string(),
                plan_id: plan.to_string(),
                seller: beta(),
            })
            .await
            .unwrap();
    }

    let total = negotiator.aggregate_resources("alpha").await.unwrap();
    assert_eq!(total, resources(&[("cpu", "3"), ("memory", "5Gi")]));
}

#[tokio::test]
async fn repeated_purchase_is_rejected_on_both_sides() {
    let buyer_store = InMemoryStore::new();
    let seller_store = InMemoryStore::new();
    let sellers = InMemorySellerGateway::new();
    let plan = Plan::new("basic", resources(&[("cpu", "500m")]));
    sellers
        .list_offer(&beta(), Offer::new("compute", "compute", vec![plan.clone()]))
        .await;
    seller_store
        .upsert_offer(&Offer::new("compute", "compute", vec![plan]))
        .await
        .unwrap();
    let buyer = negotiator(&buyer_store, &sellers);
    let seller = negotiator(&seller_store, &sellers);

    let buy = BuyContractCommand {
        buyer_id: "alpha".to_string(),
        offer_id: "compute".to_string(),
        plan_id: "basic".to_string(),
        seller: beta(),
    };
    buyer.buy(buy.clone()).await.unwrap();
    let again = buyer.buy(buy).await.unwrap_err();
    assert!(matches!(again, ContractError::DuplicateContract { .. }));
    assert_eq!(buyer_store.contract_count().await, 1);

    let sell = SellContractCommand {
        buyer_id: "gamma".to_string(),
        offer_id: "compute".to_string(),
        plan_id: "basic".to_string(),
    };
    seller.sell(sell.clone()).await.unwrap();
    let again = seller.sell(sell).await.unwrap_err();
    assert_eq!(again.code(), ErrorCode::DuplicateContract);
    assert_eq!(seller_store.contract_count().await, 1);
}

#[tokio::test]
async fn cluster_without_contracts_has_nothing_to_aggregate() {
    let store = InMemoryStore::new();
    let sellers = InMemorySellerGateway::new();

    let err = negotiator(&store, &sellers)
        .aggregate_resources("alpha")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ContractNotFound);
}
