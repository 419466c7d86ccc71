//! Cluster identity adapters.

mod static_identity;

pub use static_identity::StaticClusterIdentity;
