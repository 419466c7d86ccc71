//! Purchase requests to a seller cluster's contract endpoint.
//!
//! `POST {sellerContractEndpoint}/api/contracts/sell?offer-id=..&buyer-id=..&plan-id=..`
//! with the buyer's cluster token as bearer credential. The seller answers
//! with the contract it recorded.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use std::time::Duration;

use crate::domain::contract::ContractRecord;
use crate::ports::{PurchaseRequest, RemoteError, SellerGateway};

use super::broker_client::{base_url, send};

#[derive(Debug, Clone)]
pub struct HttpSellerGateway {
    client: Client,
    timeout: Duration,
}

impl HttpSellerGateway {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }
}

fn sell_url(seller_endpoint: &str) -> String {
    format!("{}/api/contracts/sell", base_url(seller_endpoint))
}

#[async_trait]
impl SellerGateway for HttpSellerGateway {
    async fn request_contract(
        &self,
        request: &PurchaseRequest,
    ) -> Result<ContractRecord, RemoteError> {
        let endpoint = base_url(&request.seller_endpoint);
        let builder = self
            .client
            .post(sell_url(endpoint))
            .query(&[
                ("offer-id", request.offer_id.as_str()),
                ("buyer-id", request.buyer_id.as_str()),
                ("plan-id", request.plan_id.as_str()),
            ])
            .bearer_auth(request.credential.expose_secret());

        let response = send(builder, endpoint, self.timeout).await?;
        let contract = response
            .json::<ContractRecord>()
            .await
            .map_err(|e| RemoteError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            seller = endpoint,
            contract_id = %contract.contract_id,
            offer_id = %request.offer_id,
            "Seller accepted purchase"
        );
        Ok(contract)
    }
}
