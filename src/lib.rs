//! Catalog Connector - marketplace synchronization for a resource-sharing cluster.
//!
//! Advertises the local cluster's offers to external brokers, keeps a live
//! notification channel to local subscribers and every trusted broker, and
//! negotiates buy/sell contracts against those offers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
