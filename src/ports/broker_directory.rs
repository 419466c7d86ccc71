//! Broker directory port - durable broker relationships.

use async_trait::async_trait;

use crate::domain::broker::BrokerRecord;
use crate::domain::foundation::{BrokerId, DomainError};

/// Store port for the brokers the local cluster trusts.
///
/// Several supervisors and request handlers write concurrently, so every
/// write is an upsert or delete keyed by broker id.
#[async_trait]
pub trait BrokerDirectory: Send + Sync {
    async fn list_brokers(&self) -> Result<Vec<BrokerRecord>, DomainError>;

    async fn get_broker(&self, id: &BrokerId) -> Result<Option<BrokerRecord>, DomainError>;

    /// Finds the broker registered for an endpoint.
    async fn find_broker_by_endpoint(
        &self,
        endpoint: &str,
    ) -> Result<Option<BrokerRecord>, DomainError>;

    async fn upsert_broker(&self, broker: &BrokerRecord) -> Result<(), DomainError>;

    /// Deletes a broker. Returns whether anything was deleted.
    async fn delete_broker(&self, id: &BrokerId) -> Result<bool, DomainError>;

    /// Sets the enabled flag. Returns `false` when the broker is unknown.
    async fn set_broker_enabled(&self, id: &BrokerId, enabled: bool) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_directory_is_object_safe() {
        fn _accepts_dyn(_directory: &dyn BrokerDirectory) {}
    }
}
