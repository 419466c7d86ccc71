//! In-Memory Store Adapter
//!
//! Holds offers, brokers and contracts in memory. Implements both
//! `CatalogStore` and `BrokerDirectory`, so one instance can back every
//! service. Useful for testing and local development.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::broker::BrokerRecord;
use crate::domain::catalog::Offer;
use crate::domain::contract::ContractRecord;
use crate::domain::foundation::{BrokerId, ContractId, DomainError, ErrorCode};
use crate::ports::{BrokerDirectory, CatalogStore};

type ContractKey = (String, String, String);

#[derive(Debug, Default)]
struct Contracts {
    records: HashMap<ContractId, ContractRecord>,
    /// Enabled contracts by (buyer, offer, plan).
    active: HashMap<ContractKey, ContractId>,
}

fn key_of(contract: &ContractRecord) -> ContractKey {
    (
        contract.buyer_id.clone(),
        contract.offer.offer_id.clone(),
        contract.plan_id.clone(),
    )
}

/// In-memory storage for the connector's durable collections.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    offers: Arc<RwLock<BTreeMap<String, Offer>>>,
    brokers: Arc<RwLock<BTreeMap<BrokerId, BrokerRecord>>>,
    contracts: Arc<RwLock<Contracts>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with a database error (useful for tests)
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with a database error (useful for tests)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Get the number of stored contracts
    pub async fn contract_count(&self) -> usize {
        self.contracts.read().await.records.len()
    }

    fn check_read(&self) -> Result<(), DomainError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DomainError::database("store read failed"));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("store write failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_offers(&self) -> Result<Vec<Offer>, DomainError> {
        self.check_read()?;
        Ok(self.offers.read().await.values().cloned().collect())
    }

    async fn get_offer(&self, offer_id: &str) -> Result<Option<Offer>, DomainError> {
        self.check_read()?;
        Ok(self.offers.read().await.get(offer_id).cloned())
    }

    async fn upsert_offer(&self, offer: &Offer) -> Result<(), DomainError> {
        self.check_write()?;
        self.offers
            .write()
            .await
            .insert(offer.offer_id.clone(), offer.clone());
        Ok(())
    }

    async fn delete_offer(&self, offer_id: &str) -> Result<bool, DomainError> {
        self.check_write()?;
        Ok(self.offers.write().await.remove(offer_id).is_some())
    }

    async fn list_contracts_by_buyer(
        &self,
        buyer_id: &str,
    ) -> Result<Vec<ContractRecord>, DomainError> {
        self.check_read()?;
        let contracts = self.contracts.read().await;
        let mut found: Vec<ContractRecord> = contracts
            .records
            .values()
            .filter(|c| c.buyer_id == buyer_id)
            .cloned()
            .collect();
        found.sort_by_key(|c| c.created);
        Ok(found)
    }

    async fn find_active_contract(
        &self,
        buyer_id: &str,
        offer_id: &str,
        plan_id: &str,
    ) -> Result<Option<ContractRecord>, DomainError> {
        self.check_read()?;
        let contracts = self.contracts.read().await;
        let key = (buyer_id.to_string(), offer_id.to_string(), plan_id.to_string());
        Ok(contracts
            .active
            .get(&key)
            .and_then(|id| contracts.records.get(id))
            .cloned())
    }

    async fn insert_contract(&self, contract: &ContractRecord) -> Result<(), DomainError> {
        self.check_write()?;
        let mut contracts = self.contracts.write().await;
        let key = key_of(contract);

        if contract.enabled {
            if let Some(existing) = contracts.active.get(&key) {
                if *existing != contract.contract_id {
                    return Err(DomainError::new(
                        ErrorCode::DuplicateContract,
                        format!(
                            "contract for buyer {} offer {} plan {} already exists",
                            key.0, key.1, key.2
                        ),
                    )
                    .with_detail("contractID", existing.to_string()));
                }
            }
            contracts.active.insert(key, contract.contract_id);
        } else if contracts.active.get(&key) == Some(&contract.contract_id) {
            contracts.active.remove(&key);
        }

        contracts
            .records
            .insert(contract.contract_id, contract.clone());
        Ok(())
    }
}

#[async_trait]
impl BrokerDirectory for InMemoryStore {
    async fn list_brokers(&self) -> Result<Vec<BrokerRecord>, DomainError> {
        self.check_read()?;
        Ok(self.brokers.read().await.values().cloned().collect())
    }

    async fn get_broker(&self, id: &BrokerId) -> Result<Option<BrokerRecord>, DomainError> {
        self.check_read()?;
        Ok(self.brokers.read().await.get(id).cloned())
    }

    async fn find_broker_by_endpoint(
        &self,
        endpoint: &str,
    ) -> Result<Option<BrokerRecord>, DomainError> {
        self.check_read()?;
        Ok(self
            .brokers
            .read()
            .await
            .values()
            .find(|b| b.endpoint == endpoint)
            .cloned())
    }

    async fn upsert_broker(&self, broker: &BrokerRecord) -> Result<(), DomainError> {
        self.check_write()?;
        self.brokers
            .write()
            .await
            .insert(broker.id.clone(), broker.clone());
        Ok(())
    }

    async fn delete_broker(&self, id: &BrokerId) -> Result<bool, DomainError> {
        self.check_write()?;
        Ok(self.brokers.write().await.remove(id).is_some())
    }

    async fn set_broker_enabled(&self, id: &BrokerId, enabled: bool) -> Result<bool, DomainError> {
        self.check_write()?;
        match self.brokers.write().await.get_mut(id) {
            Some(broker) => {
                broker.enabled = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Plan;
    use crate::domain::cluster::Provider;

    fn provider() -> Provider {
        Provider {
            cluster_id: "seller".to_string(),
            cluster_name: "seller".to_string(),
            endpoint: "http://seller".to_string(),
            cluster_pretty_name: "Seller".to_string(),
            cluster_contract_endpoint: "http://seller/contracts".to_string(),
        }
    }

    fn contract(buyer: &str, offer: &str, plan: &str) -> ContractRecord {
        let offer = Offer::new(offer, offer, vec![Plan::new(plan, BTreeMap::new())]);
        ContractRecord::form(buyer, provider(), offer, plan)
    }

    fn broker(id: &str) -> BrokerRecord {
        BrokerRecord::new(
            BrokerId::new(id).unwrap(),
            id,
            format!("http://{}.example", id),
            "t",
        )
    }

    #[tokio::test]
    async fn offers_are_listed_by_id() {
        let store = InMemoryStore::new();
        for id in ["b", "a", "c"] {
            store
                .upsert_offer(&Offer::new(id, id, Vec::new()))
                .await
                .unwrap();
        }

        let ids: Vec<String> = store
            .list_offers()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.offer_id)
            .collect();

        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn delete_offer_reports_whether_it_existed() {
        let store = InMemoryStore::new();
        store
            .upsert_offer(&Offer::new("o", "o", Vec::new()))
            .await
            .unwrap();

        assert!(store.delete_offer("o").await.unwrap());
        assert!(!store.delete_offer("o").await.unwrap());
    }

    #[tokio::test]
    async fn second_active_contract_for_same_triple_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_contract(&contract("buyer", "o", "p")).await.unwrap();

        let err = store
            .insert_contract(&contract("buyer", "o", "p"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DuplicateContract);
        assert_eq!(store.contract_count().await, 1);
    }

    #[tokio::test]
    async fn reinserting_the_same_contract_is_an_upsert() {
        let store = InMemoryStore::new();
        let c = contract("buyer", "o", "p");
        store.insert_contract(&c).await.unwrap();
        store.insert_contract(&c).await.unwrap();
        assert_eq!(store.contract_count().await, 1);
    }

    #[tokio::test]
    async fn disabled_contract_frees_its_triple() {
        let store = InMemoryStore::new();
        let mut c = contract("buyer", "o", "p");
        store.insert_contract(&c).await.unwrap();
        c.enabled = false;
        store.insert_contract(&c).await.unwrap();

        assert!(store
            .find_active_contract("buyer", "o", "p")
            .await
            .unwrap()
            .is_none());
        store.insert_contract(&contract("buyer", "o", "p")).await.unwrap();
        assert_eq!(store.list_contracts_by_buyer("buyer").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_inserts_admit_exactly_one() {
        let store = InMemoryStore::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_contract(&contract("buyer", "o", "p")).await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn brokers_are_found_by_endpoint_and_toggled() {
        let store = InMemoryStore::new();
        let b = broker("b1");
        store.upsert_broker(&b).await.unwrap();

        let found = store
            .find_broker_by_endpoint("http://b1.example")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, b.id);

        assert!(store.set_broker_enabled(&b.id, false).await.unwrap());
        assert!(!store.get_broker(&b.id).await.unwrap().unwrap().enabled);
        assert!(!store
            .set_broker_enabled(&BrokerId::new("ghost").unwrap(), true)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_database_errors() {
        let store = InMemoryStore::new();
        store.fail_reads(true);
        assert_eq!(
            store.list_brokers().await.unwrap_err().code,
            ErrorCode::DatabaseError
        );

        store.fail_reads(false);
        store.fail_writes(true);
        assert_eq!(
            store.upsert_broker(&broker("b")).await.unwrap_err().code,
            ErrorCode::DatabaseError
        );
    }
}
