//! Broker subscriber port - control over live broker supervisors.
//!
//! Implemented by the websocket adapter, consumed by the broker registry.

use async_trait::async_trait;

use crate::domain::broker::BrokerRecord;
use crate::domain::foundation::BrokerId;

#[async_trait]
pub trait BrokerSubscriber: Send + Sync {
    /// Starts a supervisor for the broker, or resumes a paused one.
    async fn subscribe(&self, broker: BrokerRecord);

    /// Pauses the broker's supervisor without closing its session.
    async fn unsubscribe(&self, broker_id: &BrokerId);

    /// Stops the broker's supervisor and closes its session.
    async fn stop(&self, broker_id: &BrokerId);
}
