//! Broker transport port - the live session to a broker.
//!
//! A link is a message-framed bidirectional connection. Supervisors read
//! from it in a loop; a read error or a close ends the session.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::broker::BrokerRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid broker endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),
}

/// One open session to a broker.
#[async_trait]
pub trait BrokerLink: Send {
    /// Next payload. `Ok(None)` once the peer has closed the session.
    ///
    /// Must be cancel safe: supervisors race it against control changes.
    async fn read_message(&mut self) -> Result<Option<String>, TransportError>;

    async fn write_message(&mut self, payload: &str) -> Result<(), TransportError>;

    async fn close(&mut self);
}

/// Opens sessions to brokers.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    async fn connect(&self, broker: &BrokerRecord) -> Result<Box<dyn BrokerLink>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_transport_is_object_safe() {
        fn _accepts_dyn(_transport: &dyn BrokerTransport) {}
        fn _accepts_link(_link: &mut dyn BrokerLink) {}
    }
}
