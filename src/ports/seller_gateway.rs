//! Seller gateway port - purchase requests to another cluster.

use async_trait::async_trait;
use secrecy::Secret;

use crate::domain::contract::ContractRecord;

use super::RemoteError;

/// A purchase of one plan, addressed to the seller's contract endpoint.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub seller_endpoint: String,
    pub offer_id: String,
    pub buyer_id: String,
    pub plan_id: String,
    /// The buyer cluster's own token, presented as bearer credential.
    pub credential: Secret<String>,
}

#[async_trait]
pub trait SellerGateway: Send + Sync {
    /// Asks the seller to form a contract and returns the seller's record.
    async fn request_contract(
        &self,
        request: &PurchaseRequest,
    ) -> Result<ContractRecord, RemoteError>;
}
