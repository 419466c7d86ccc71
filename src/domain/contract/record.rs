//! Contract records.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{Offer, Plan};
use crate::domain::cluster::Provider;
use crate::domain::foundation::{ContractId, Timestamp};

/// An agreed purchase of one plan of one offer.
///
/// `offer` is a snapshot taken when the contract was formed. Later edits to
/// the source offer never reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    #[serde(rename = "contractID")]
    pub contract_id: ContractId,

    #[serde(rename = "buyerID")]
    pub buyer_id: String,

    pub seller: Provider,

    pub offer: Offer,

    #[serde(rename = "planID")]
    pub plan_id: String,

    pub enabled: bool,

    /// Epoch seconds.
    pub created: i64,
}

impl ContractRecord {
    /// Forms a new enabled contract stamped with the current time.
    pub fn form(
        buyer_id: impl Into<String>,
        seller: Provider,
        offer: Offer,
        plan_id: impl Into<String>,
    ) -> Self {
        Self {
            contract_id: ContractId::new(),
            buyer_id: buyer_id.into(),
            seller,
            offer,
            plan_id: plan_id.into(),
            enabled: true,
            created: Timestamp::now().unix_seconds(),
        }
    }

    /// The purchased plan, looked up in the snapshot.
    pub fn plan(&self) -> Option<&Plan> {
        self.offer.find_plan(&self.plan_id)
    }

    /// True when the record is for this buyer, offer and plan.
    pub fn matches(&self, buyer_id: &str, offer_id: &str, plan_id: &str) -> bool {
        self.buyer_id == buyer_id && self.offer.offer_id == offer_id && self.plan_id == plan_id
    }

    /// True when this record blocks another contract for the same triple.
    pub fn conflicts_with(&self, buyer_id: &str, offer_id: &str, plan_id: &str) -> bool {
        self.enabled && self.matches(buyer_id, offer_id, plan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn contract() -> ContractRecord {
        let plan = Plan::new("p-1", BTreeMap::new());
        ContractRecord::form(
            "buyer",
            Provider {
                cluster_id: "seller".to_string(),
                cluster_name: String::new(),
                endpoint: String::new(),
                cluster_pretty_name: String::new(),
                cluster_contract_endpoint: String::new(),
            },
            Offer::new("o-1", "Offer", vec![plan]),
            "p-1",
        )
    }

    #[test]
    fn formed_contract_is_enabled_and_stamped() {
        let c = contract();
        assert!(c.enabled);
        assert!(c.created > 0);
        assert!(c.plan().is_some());
    }

    #[test]
    fn disabled_contract_does_not_conflict() {
        let mut c = contract();
        assert!(c.conflicts_with("buyer", "o-1", "p-1"));
        assert!(!c.conflicts_with("buyer", "o-1", "p-2"));
        c.enabled = false;
        assert!(!c.conflicts_with("buyer", "o-1", "p-1"));
        assert!(c.matches("buyer", "o-1", "p-1"));
    }

    #[test]
    fn serializes_with_wire_names() {
        let value = serde_json::to_value(contract()).unwrap();
        assert!(value.get("contractID").is_some());
        assert_eq!(value["buyerID"], "buyer");
        assert_eq!(value["seller"]["clusterID"], "seller");
        assert_eq!(value["offer"]["offerID"], "o-1");
        assert_eq!(value["planID"], "p-1");
    }
}
