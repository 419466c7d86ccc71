//! HTTP adapters - clients for remote brokers and seller clusters.
//!
//! - [`HttpBrokerGateway`] - broker REST API over reqwest
//! - [`HttpSellerGateway`] - seller contract endpoint over reqwest
//! - [`InMemoryBrokerGateway`] / [`InMemorySellerGateway`] - simulated
//!   remotes for tests and local runs

mod broker_client;
mod in_memory_broker;
mod in_memory_seller;
mod seller_client;

pub use broker_client::{HttpBrokerClient, HttpBrokerGateway};
pub use in_memory_broker::{BrokerCall, InMemoryBrokerGateway};
pub use in_memory_seller::InMemorySellerGateway;
pub use seller_client::HttpSellerGateway;
