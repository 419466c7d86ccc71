//! Offer publication and broker synchronization.

mod catalog;
mod periodic;
mod sync_engine;

pub use catalog::{CatalogError, OfferCatalog};
pub use periodic::PeriodicSync;
pub use sync_engine::{BrokerFailure, OfferSyncEngine, SyncError, SyncReport};
