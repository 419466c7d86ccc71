//! Cluster identity port.

use async_trait::async_trait;

use crate::domain::cluster::{ClusterParameters, Provider};
use crate::domain::foundation::DomainError;

/// Supplies the local cluster's credentials and public description.
#[async_trait]
pub trait ClusterIdentity: Send + Sync {
    async fn local_parameters(&self) -> Result<ClusterParameters, DomainError>;

    /// Where other clusters send purchase requests. `None` until configured.
    async fn contract_endpoint(&self) -> Result<Option<String>, DomainError>;

    /// The seller snapshot embedded in contracts this cluster forms.
    async fn local_provider(&self) -> Result<Provider, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_identity_is_object_safe() {
        fn _accepts_dyn(_identity: &dyn ClusterIdentity) {}
    }
}
