//! ContractNegotiator - buy and sell contracts over marketplace offers.
//!
//! Both roles reject a purchase when an enabled contract already exists for
//! the same buyer, offer and plan. The check runs before any network call
//! or write, and the store repeats it atomically on insert, so a retried
//! request never creates a second record.

use std::sync::Arc;

use secrecy::Secret;

use crate::domain::cluster::Provider;
use crate::domain::contract::{aggregate_resources, ContractRecord, ResourceList};
use crate::domain::foundation::{ContractId, DomainError, ErrorCode};
use crate::ports::{CatalogStore, ClusterIdentity, PurchaseRequest, RemoteError, SellerGateway};

use super::errors::ContractError;

/// Command to buy a plan from a remote seller.
#[derive(Debug, Clone)]
pub struct BuyContractCommand {
    pub buyer_id: String,
    pub offer_id: String,
    pub plan_id: String,
    pub seller: Provider,
}

/// Command to record a sale requested by a remote buyer.
#[derive(Debug, Clone)]
pub struct SellContractCommand {
    pub buyer_id: String,
    pub offer_id: String,
    pub plan_id: String,
}

pub struct ContractNegotiator {
    catalog: Arc<dyn CatalogStore>,
    identity: Arc<dyn ClusterIdentity>,
    sellers: Arc<dyn SellerGateway>,
}

impl ContractNegotiator {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        identity: Arc<dyn ClusterIdentity>,
        sellers: Arc<dyn SellerGateway>,
    ) -> Self {
        Self {
            catalog,
            identity,
            sellers,
        }
    }

    /// Buys a plan from the seller and records the contract locally.
    pub async fn buy(&self, cmd: BuyContractCommand) -> Result<ContractId, ContractError> {
        require("buyerID", &cmd.buyer_id)?;
        require("offerID", &cmd.offer_id)?;
        require("planID", &cmd.plan_id)?;
        if cmd.seller.cluster_id.trim().is_empty() {
            return Err(ContractError::InvalidSeller("seller clusterID is empty".to_string()));
        }
        if cmd.seller.cluster_id == cmd.buyer_id {
            return Err(ContractError::InvalidSeller(
                "a cluster cannot buy from itself".to_string(),
            ));
        }
        if cmd.seller.cluster_contract_endpoint.trim().is_empty() {
            return Err(ContractError::InvalidSeller(
                "seller contract endpoint is empty".to_string(),
            ));
        }
        self.reject_duplicate(&cmd.buyer_id, &cmd.offer_id, &cmd.plan_id)
            .await?;

        let parameters = self
            .identity
            .local_parameters()
            .await
            .map_err(ContractError::Identity)?;
        let request = PurchaseRequest {
            seller_endpoint: cmd.seller.cluster_contract_endpoint.clone(),
            offer_id: cmd.offer_id.clone(),
            buyer_id: cmd.buyer_id.clone(),
            plan_id: cmd.plan_id.clone(),
            credential: Secret::new(parameters.bearer_token().to_string()),
        };

        let contract = self.sellers.request_contract(&request).await.map_err(|err| {
            tracing::warn!(seller = %cmd.seller.cluster_id, offer_id = %cmd.offer_id, error = %err, "Purchase failed");
            ContractError::Negotiation(err)
        })?;

        if !contract.matches(&cmd.buyer_id, &cmd.offer_id, &cmd.plan_id) {
            return Err(ContractError::Negotiation(RemoteError::InvalidResponse {
                endpoint: request.seller_endpoint,
                reason: "contract does not match the purchase".to_string(),
            }));
        }
        if !contract.enabled {
            return Err(ContractError::Negotiation(RemoteError::InvalidResponse {
                endpoint: request.seller_endpoint,
                reason: format!("seller returned disabled contract {}", contract.contract_id),
            }));
        }

        self.insert(&contract).await?;
        tracing::info!(
            contract_id = %contract.contract_id,
            seller = %cmd.seller.cluster_id,
            offer_id = %cmd.offer_id,
            plan_id = %cmd.plan_id,
            "Contract bought"
        );
        Ok(contract.contract_id)
    }

    /// Records a sale of a local plan and returns the contract for the buyer.
    pub async fn sell(&self, cmd: SellContractCommand) -> Result<ContractRecord, ContractError> {
        require("buyerID", &cmd.buyer_id)?;
        require("offerID", &cmd.offer_id)?;
        require("planID", &cmd.plan_id)?;

        let offer = self
            .catalog
            .get_offer(&cmd.offer_id)
            .await?
            .ok_or_else(|| ContractError::OfferNotFound(cmd.offer_id.clone()))?;
        if offer.find_plan(&cmd.plan_id).is_none() {
            return Err(ContractError::PlanNotFound {
                offer_id: cmd.offer_id,
                plan_id: cmd.plan_id,
            });
        }
        self.reject_duplicate(&cmd.buyer_id, &cmd.offer_id, &cmd.plan_id)
            .await?;

        let seller = self
            .identity
            .local_provider()
            .await
            .map_err(ContractError::Identity)?;
        let contract = ContractRecord::form(cmd.buyer_id, seller, offer, cmd.plan_id);

        self.insert(&contract).await?;
        tracing::info!(
            contract_id = %contract.contract_id,
            buyer_id = %contract.buyer_id,
            offer_id = %contract.offer.offer_id,
            "Contract sold"
        );
        Ok(contract)
    }

    /// Total resources granted to `buyer_id` by its contracts.
    pub async fn aggregate_resources(&self, buyer_id: &str) -> Result<ResourceList, ContractError> {
        require("buyerID", buyer_id)?;
        let contracts = self.catalog.list_contracts_by_buyer(buyer_id).await?;
        if contracts.is_empty() {
            return Err(ContractError::NoContracts(buyer_id.to_string()));
        }
        Ok(aggregate_resources(&contracts)?)
    }

    pub async fn contracts_of(&self, buyer_id: &str) -> Result<Vec<ContractRecord>, ContractError> {
        Ok(self.catalog.list_contracts_by_buyer(buyer_id).await?)
    }

    async fn reject_duplicate(
        &self,
        buyer_id: &str,
        offer_id: &str,
        plan_id: &str,
    ) -> Result<(), ContractError> {
        match self
            .catalog
            .find_active_contract(buyer_id, offer_id, plan_id)
            .await?
        {
            Some(existing) => {
                tracing::debug!(contract_id = %existing.contract_id, "Duplicate contract rejected");
                Err(ContractError::duplicate(buyer_id, offer_id, plan_id))
            }
            None => Ok(()),
        }
    }

    async fn insert(&self, contract: &ContractRecord) -> Result<(), ContractError> {
        self.catalog
            .insert_contract(contract)
            .await
            .map_err(|err: DomainError| match err.code {
                ErrorCode::DuplicateContract => ContractError::duplicate(
                    &contract.buyer_id,
                    &contract.offer.offer_id,
                    &contract.plan_id,
                ),
                _ => ContractError::Store(err),
            })
    }
}

fn require(name: &'static str, value: &str) -> Result<(), ContractError> {
    if value.trim().is_empty() {
        return Err(ContractError::MissingParameter(name));
    }
    Ok(())
}
