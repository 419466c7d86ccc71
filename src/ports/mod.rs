//! Ports - collaborator interfaces consumed by the application layer.
//!
//! - [`CatalogStore`] / [`BrokerDirectory`] - the external document store
//! - [`BrokerGateway`] / [`RemoteBrokerApi`] - broker HTTP APIs
//! - [`SellerGateway`] - purchase requests to other clusters
//! - [`ClusterIdentity`] - local cluster credentials
//! - [`BrokerTransport`] - live broker sessions
//! - [`BrokerSubscriber`] - control over broker supervisors

mod broker_directory;
mod broker_gateway;
mod broker_subscriber;
mod broker_transport;
mod catalog_store;
mod cluster_identity;
mod seller_gateway;

pub use broker_directory::BrokerDirectory;
pub use broker_gateway::{BrokerGateway, RemoteBrokerApi, RemoteError};
pub use broker_subscriber::BrokerSubscriber;
pub use broker_transport::{BrokerLink, BrokerTransport, TransportError};
pub use catalog_store::CatalogStore;
pub use cluster_identity::ClusterIdentity;
pub use seller_gateway::{PurchaseRequest, SellerGateway};
