//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    Cart(CartEvent),
    Checkout(CheckoutEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    Merged { user_id: String, lines_merged: usize, at: DateTime<Utc> },
    MergeInterrupted { user_id: String, lines_merged: usize, lines_remaining: usize, at: DateTime<Utc> },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutEvent {
    Submitted { order_ref: Uuid, owner_id: Option<String>, total: Decimal, at: DateTime<Utc> },
    Failed { order_ref: Uuid, reason: String, at: DateTime<Utc> },
}

impl DomainEvent {
    /// Message subject the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Cart(CartEvent::Merged { .. }) => "storefront.cart.merged",
            Self::Cart(CartEvent::MergeInterrupted { .. }) => "storefront.cart.merge_interrupted",
            Self::Checkout(CheckoutEvent::Submitted { .. }) => "storefront.checkout.submitted",
            Self::Checkout(CheckoutEvent::Failed { .. }) => "storefront.checkout.failed",
        }
    }
}
