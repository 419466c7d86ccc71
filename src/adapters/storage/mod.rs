//! Storage Adapters
//!
//! The durable store is an external collaborator. This module provides the
//! in-memory implementation of the `CatalogStore` and `BrokerDirectory`
//! ports used by tests and by the binary for local runs.

mod in_memory;

pub use in_memory::InMemoryStore;
