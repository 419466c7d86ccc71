//! Contract negotiation between buyer and seller clusters.

mod errors;
mod negotiator;

pub use errors::ContractError;
pub use negotiator::{BuyContractCommand, ContractNegotiator, SellContractCommand};
