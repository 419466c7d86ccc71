//! Domain layer containing marketplace types and rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, errors)
//! - `catalog` - Offers, plans and resource quantities
//! - `broker` - Broker relationships and reconnect policy
//! - `contract` - Contract records and resource aggregation
//! - `cluster` - Local cluster identity

pub mod broker;
pub mod catalog;
pub mod cluster;
pub mod contract;
pub mod foundation;
