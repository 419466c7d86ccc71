//! Offers, plans and broker catalogs.
//!
//! Field names follow the broker API so the same types travel over the
//! wire and through the store unchanged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::ValidationError;

/// A priced resource allocation within an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "planID")]
    pub plan_id: String,

    #[serde(rename = "planName", default)]
    pub name: String,

    #[serde(rename = "planCost", default)]
    pub cost: f64,

    #[serde(rename = "planCostCurrency", default)]
    pub cost_currency: String,

    #[serde(rename = "planCostPeriod", default)]
    pub cost_period: String,

    #[serde(rename = "planQuantity", default)]
    pub quantity: i64,

    /// Resource name to quantity string, e.g. `cpu -> "2"`.
    #[serde(default)]
    pub resources: BTreeMap<String, String>,
}

impl Plan {
    /// Creates a plan with the given id and resources, other fields defaulted.
    pub fn new(plan_id: impl Into<String>, resources: BTreeMap<String, String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            name: String::new(),
            cost: 0.0,
            cost_currency: String::new(),
            cost_period: String::new(),
            quantity: 1,
            resources,
        }
    }
}

/// A sellable bundle of plans published by the local cluster.
///
/// `offer_id` is the business key. Brokers create, update and delete by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    #[serde(rename = "offerID")]
    pub offer_id: String,

    #[serde(rename = "offerName", default)]
    pub name: String,

    #[serde(rename = "offerType", default)]
    pub offer_type: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub plans: Vec<Plan>,

    #[serde(rename = "clusterPrettyName", default)]
    pub cluster_pretty_name: String,

    /// Epoch seconds.
    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub status: bool,
}

impl Offer {
    /// Creates an active offer with the given plans.
    pub fn new(offer_id: impl Into<String>, name: impl Into<String>, plans: Vec<Plan>) -> Self {
        Self {
            offer_id: offer_id.into(),
            name: name.into(),
            offer_type: String::new(),
            description: String::new(),
            plans,
            cluster_pretty_name: String::new(),
            created: 0,
            status: true,
        }
    }

    /// Looks up a plan by id.
    pub fn find_plan(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.plan_id == plan_id)
    }

    /// Checks the fields every stored offer must carry.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.offer_id.trim().is_empty() {
            return Err(ValidationError::empty_field("offerID"));
        }
        if let Some(plan) = self.plans.iter().find(|p| p.plan_id.trim().is_empty()) {
            return Err(ValidationError::invalid_format(
                "plans",
                format!("plan '{}' has an empty planID", plan.name),
            ));
        }
        Ok(())
    }
}

/// The offers a broker holds for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub offers: Vec<Offer>,

    #[serde(rename = "clusterContractEndpoint", default)]
    pub cluster_contract_endpoint: String,

    #[serde(default)]
    pub created: i64,

    #[serde(rename = "clusterID", default)]
    pub cluster_id: String,

    #[serde(rename = "clusterName", default)]
    pub cluster_name: String,

    #[serde(default)]
    pub endpoint: String,
}
