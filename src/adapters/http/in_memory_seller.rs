//! In-memory seller clusters for testing purchases.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::catalog::Offer;
use crate::domain::cluster::Provider;
use crate::domain::contract::ContractRecord;
use crate::ports::{PurchaseRequest, RemoteError, SellerGateway};

#[derive(Debug, Default)]
struct SimulatedSeller {
    provider: Option<Provider>,
    offers: HashMap<String, Offer>,
    sold: Vec<ContractRecord>,
    failing: bool,
    issue_disabled: bool,
}

/// Sellers keyed by contract endpoint.
#[derive(Debug, Clone, Default)]
pub struct InMemorySellerGateway {
    sellers: Arc<RwLock<HashMap<String, SimulatedSeller>>>,
}

impl InMemorySellerGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists an offer at the seller reachable on `provider`'s contract endpoint.
    pub async fn list_offer(&self, provider: &Provider, offer: Offer) {
        let mut sellers = self.sellers.write().await;
        let seller = sellers
            .entry(provider.cluster_contract_endpoint.clone())
            .or_default();
        seller.provider = Some(provider.clone());
        seller.offers.insert(offer.offer_id.clone(), offer);
    }

    pub async fn fail(&self, endpoint: &str) {
        self.sellers
            .write()
            .await
            .entry(endpoint.to_string())
            .or_default()
            .failing = true;
    }

    /// The seller answers purchases with contracts that are already disabled.
    pub async fn issue_disabled(&self, endpoint: &str) {
        self.sellers
            .write()
            .await
            .entry(endpoint.to_string())
            .or_default()
            .issue_disabled = true;
    }

    /// Contracts the seller recorded, in order.
    pub async fn sold(&self, endpoint: &str) -> Vec<ContractRecord> {
        self.sellers
            .read()
            .await
            .get(endpoint)
            .map(|s| s.sold.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SellerGateway for InMemorySellerGateway {
    async fn request_contract(
        &self,
        request: &PurchaseRequest,
    ) -> Result<ContractRecord, RemoteError> {
        let endpoint = request.seller_endpoint.as_str();
        let mut sellers = self.sellers.write().await;
        let seller = sellers
            .get_mut(endpoint)
            .ok_or_else(|| RemoteError::transport(endpoint, "connection refused"))?;

        if seller.failing {
            return Err(RemoteError::unexpected_status(
                endpoint,
                500,
                r#"{"error":"seller unavailable"}"#,
            ));
        }

        let offer = seller.offers.get(&request.offer_id).cloned().ok_or_else(|| {
            RemoteError::unexpected_status(endpoint, 404, r#"{"error":"offer not found"}"#)
        })?;
        if offer.find_plan(&request.plan_id).is_none() {
            return Err(RemoteError::unexpected_status(
                endpoint,
                400,
                &format!(
                    r#"{{"error":"No such plan {} in offer {}"}}"#,
                    request.plan_id, request.offer_id
                ),
            ));
        }
        let provider = seller
            .provider
            .clone()
            .ok_or_else(|| RemoteError::transport(endpoint, "seller has no identity"))?;

        let mut contract =
            ContractRecord::form(request.buyer_id.clone(), provider, offer, request.plan_id.clone());
        contract.enabled = !seller.issue_disabled;
        seller.sold.push(contract.clone());
        Ok(contract)
    }
}
