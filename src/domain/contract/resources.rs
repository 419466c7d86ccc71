//! Resource aggregation across a buyer's contracts.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::catalog::{Quantity, QuantityError};

use super::ContractRecord;

/// Resource name to quantity string.
pub type ResourceList = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("contract {contract_id} references plan {plan_id} missing from its offer")]
    MissingPlan { contract_id: String, plan_id: String },

    #[error("resource '{resource}': {source}")]
    InvalidQuantity {
        resource: String,
        #[source]
        source: QuantityError,
    },

    #[error("resource '{resource}' overflows when summed")]
    Overflow { resource: String },
}

/// Combines the plan resources of every contract.
///
/// One contract yields its plan's resources verbatim. Several contracts are
/// summed per resource name.
pub fn aggregate_resources(contracts: &[ContractRecord]) -> Result<ResourceList, AggregationError> {
    let mut plans = Vec::with_capacity(contracts.len());
    for contract in contracts {
        let plan = contract
            .plan()
            .ok_or_else(|| AggregationError::MissingPlan {
                contract_id: contract.contract_id.to_string(),
                plan_id: contract.plan_id.clone(),
            })?;
        plans.push(plan);
    }

    if let [only] = plans.as_slice() {
        return Ok(only.resources.clone());
    }

    let mut totals: BTreeMap<String, Quantity> = BTreeMap::new();
    for plan in plans {
        for (resource, raw) in &plan.resources {
            let quantity =
                Quantity::parse(raw).map_err(|source| AggregationError::InvalidQuantity {
                    resource: resource.clone(),
                    source,
                })?;
            let total = match totals.get(resource) {
                Some(current) => current
                    .checked_add(&quantity)
                    .ok_or_else(|| AggregationError::Overflow {
                        resource: resource.clone(),
                    })?,
                None => quantity,
            };
            totals.insert(resource.clone(), total);
        }
    }

    Ok(totals
        .into_iter()
        .map(|(resource, total)| (resource, total.to_string()))
        .collect())
}
