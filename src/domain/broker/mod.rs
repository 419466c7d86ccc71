//! Broker module - broker relationships and reconnect policy.

mod backoff;
mod record;

pub use backoff::BackoffPolicy;
pub use record::{AuthenticationRequest, AuthenticationResponse, BrokerRecord};
