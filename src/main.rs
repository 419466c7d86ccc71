//! catalog-connector - marketplace connector for one cluster.
//!
//! Wires the in-memory store, the broker HTTP client, the broker WebSocket
//! transport and both hubs, resumes stored brokers and serves
//! `GET /api/subscribe` for local dashboards.
//!
//! The binary serves only the subscriber endpoint. Registering brokers,
//! publishing offers and negotiating contracts go through the library
//! services (`BrokerRegistry`, `OfferCatalog`, `ContractNegotiator`), which
//! an embedding process constructs over its own durable store. Started on
//! its own, the store is empty and stays that way.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_connector::adapters::http::HttpBrokerGateway;
use catalog_connector::adapters::identity::StaticClusterIdentity;
use catalog_connector::adapters::storage::InMemoryStore;
use catalog_connector::adapters::websocket::{
    subscriber_router, BrokerHub, BrokerSubscriptions, ClientHub, SubscriberState,
    TungsteniteTransport,
};
use catalog_connector::application::{BrokerRegistry, OfferSyncEngine, PeriodicSync};
use catalog_connector::config::AppConfig;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config);

    let remote_timeout = config.brokers.remote_timeout();
    let store = InMemoryStore::new();
    let brokers = Arc::new(HttpBrokerGateway::new(remote_timeout)?);
    let identity = Arc::new(StaticClusterIdentity::from_config(&config.cluster));
    let transport = Arc::new(TungsteniteTransport::new(remote_timeout));

    let clients = ClientHub::spawn(config.hub.probe_interval());
    let broker_hub = BrokerHub::spawn(clients.clone());

    let sync = Arc::new(OfferSyncEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        brokers.clone(),
        remote_timeout,
    ));
    let subscriptions = Arc::new(BrokerSubscriptions::new(
        broker_hub,
        transport,
        Arc::clone(&sync),
        Arc::new(store.clone()),
        config.brokers.backoff_policy(),
    ));
    let registry = BrokerRegistry::new(
        Arc::new(store.clone()),
        brokers,
        identity,
        subscriptions,
        Arc::clone(&sync),
    );

    registry.resume_all().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let periodic = config.brokers.sync_interval().map(|interval| {
        let periodic = PeriodicSync::new(Arc::clone(&sync), interval);
        tokio::spawn(async move { periodic.run(shutdown_rx).await })
    });

    let app = Router::new()
        .nest(
            "/api",
            subscriber_router(SubscriberState::new(clients, config.hub.client_buffer)),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, cluster_id = %config.cluster.cluster_id, "Catalog connector listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = periodic {
        if let Ok(rounds) = handle.await {
            tracing::info!(rounds, "Periodic sync finished");
        }
    }
    tracing::info!("Catalog connector stopped");
    Ok(())
}
