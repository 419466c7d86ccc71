//! Application layer - services orchestrating the ports.
//!
//! - `offers` - offer publication, broker sync and periodic reconciliation
//! - `contracts` - buy/sell negotiation and resource aggregation
//! - `brokers` - broker registration, removal and subscription control

pub mod brokers;
pub mod contracts;
pub mod offers;

pub use brokers::{BrokerError, BrokerRegistry};
pub use contracts::{BuyContractCommand, ContractError, ContractNegotiator, SellContractCommand};
pub use offers::{
    BrokerFailure, CatalogError, OfferCatalog, OfferSyncEngine, PeriodicSync, SyncError,
    SyncReport,
};
