//! Aggregates module
pub mod cart;
pub mod order;

pub use cart::{Cart, CartLineItem, ProductSnapshot};
pub use order::{AddressInfo, OrderDraft, OrderInitiation, OrderPayload};
