//! Catalog module - offers, plans and resource quantities.

mod offer;
mod quantity;

pub use offer::{Catalog, Offer, Plan};
pub use quantity::{Quantity, QuantityError, QuantityFormat};
