//! Broker relationship management.

mod registry;

pub use registry::{BrokerError, BrokerRegistry};
