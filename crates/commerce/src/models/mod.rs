//! Domain types for the order lifecycle subsystem.
//!
//! These types represent validated domain objects separate from database row
//! types; the row-to-domain mapping lives in [`crate::db`].

pub mod address;
pub mod order;
pub mod promo;

pub use address::StandingAddress;
pub use order::{AddressSnapshot, AppliedPromo, NewOrder, NewOrderLine, Order, OrderLine};
pub use promo::PromoCode;
