//! Contract negotiation errors.

use thiserror::Error;

use crate::domain::contract::AggregationError;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::RemoteError;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid seller: {0}")]
    InvalidSeller(String),

    #[error("contract for buyer {buyer_id}, offer {offer_id}, plan {plan_id} already exists")]
    DuplicateContract {
        buyer_id: String,
        offer_id: String,
        plan_id: String,
    },

    #[error("offer {0} not found")]
    OfferNotFound(String),

    #[error("No such plan {plan_id} in offer {offer_id}")]
    PlanNotFound { offer_id: String, plan_id: String },

    #[error("No contracts found for cluster {0}")]
    NoContracts(String),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("negotiation with seller failed: {0}")]
    Negotiation(#[from] RemoteError),

    #[error("cluster identity unavailable: {0}")]
    Identity(DomainError),

    #[error("contract store failure: {0}")]
    Store(DomainError),
}

impl ContractError {
    pub fn duplicate(buyer_id: &str, offer_id: &str, plan_id: &str) -> Self {
        ContractError::DuplicateContract {
            buyer_id: buyer_id.to_string(),
            offer_id: offer_id.to_string(),
            plan_id: plan_id.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ContractError::MissingParameter(_) => ErrorCode::EmptyField,
            ContractError::InvalidSeller(_) => ErrorCode::ValidationFailed,
            ContractError::DuplicateContract { .. } => ErrorCode::DuplicateContract,
            ContractError::OfferNotFound(_) => ErrorCode::OfferNotFound,
            ContractError::PlanNotFound { .. } => ErrorCode::PlanNotFound,
            ContractError::NoContracts(_) => ErrorCode::ContractNotFound,
            ContractError::Aggregation(_) => ErrorCode::InvalidFormat,
            ContractError::Negotiation(_) => ErrorCode::RemoteError,
            ContractError::Identity(err) | ContractError::Store(err) => err.code,
        }
    }

    /// True for rejections made before any side effect.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ContractError::MissingParameter(_)
                | ContractError::InvalidSeller(_)
                | ContractError::DuplicateContract { .. }
                | ContractError::OfferNotFound(_)
                | ContractError::PlanNotFound { .. }
        )
    }
}

impl From<DomainError> for ContractError {
    fn from(err: DomainError) -> Self {
        ContractError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_not_found_message_names_plan_and_offer() {
        let err = ContractError::PlanNotFound {
            offer_id: "o-1".to_string(),
            plan_id: "gold".to_string(),
        };
        assert_eq!(err.to_string(), "No such plan gold in offer o-1");
        assert_eq!(err.code(), ErrorCode::PlanNotFound);
    }

    #[test]
    fn store_errors_keep_their_code() {
        let err: ContractError = DomainError::database("down").into();
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert!(!err.is_validation());
    }

    #[test]
    fn duplicate_is_a_validation_error() {
        let err = ContractError::duplicate("b", "o", "p");
        assert_eq!(err.code(), ErrorCode::DuplicateContract);
        assert!(err.is_validation());
    }
}
