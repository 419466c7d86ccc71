//! Catalog store port - durable offers and contracts.
//!
//! The document store behind this port is an external collaborator. Writes
//! are idempotent upserts keyed by business identifier.

use async_trait::async_trait;

use crate::domain::catalog::Offer;
use crate::domain::contract::ContractRecord;
use crate::domain::foundation::DomainError;

/// Store port for the local catalog and the contracts formed against it.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All local offers.
    async fn list_offers(&self) -> Result<Vec<Offer>, DomainError>;

    /// Finds an offer by its business key.
    ///
    /// Returns `None` if not found.
    async fn get_offer(&self, offer_id: &str) -> Result<Option<Offer>, DomainError>;

    /// Creates or replaces an offer keyed by `offer_id`.
    async fn upsert_offer(&self, offer: &Offer) -> Result<(), DomainError>;

    /// Deletes an offer. Returns whether anything was deleted.
    async fn delete_offer(&self, offer_id: &str) -> Result<bool, DomainError>;

    /// Every contract, enabled or not, held by a buyer.
    async fn list_contracts_by_buyer(
        &self,
        buyer_id: &str,
    ) -> Result<Vec<ContractRecord>, DomainError>;

    /// The enabled contract for a `(buyer, offer, plan)` triple, if any.
    async fn find_active_contract(
        &self,
        buyer_id: &str,
        offer_id: &str,
        plan_id: &str,
    ) -> Result<Option<ContractRecord>, DomainError>;

    /// Persists a new contract.
    ///
    /// # Errors
    ///
    /// - `DuplicateContract` if an enabled contract already exists for the
    ///   same triple; the check and the write are atomic
    /// - `DatabaseError` on persistence failure
    async fn insert_contract(&self, contract: &ContractRecord) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn CatalogStore) {}
    }
}
