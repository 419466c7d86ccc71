//! Contract module - contract records and resource aggregation.

mod record;
mod resources;

pub use record::ContractRecord;
pub use resources::{aggregate_resources, AggregationError, ResourceList};
