//! Order submission payload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::CartLineItem;
use crate::pricing::OrderTotals;

/// Delivery address attached to an order, either copied from a saved address or typed in by a guest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_id: Option<String>,
    pub full_name: String,
    pub address_line: String,
    pub city: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Everything the order/payment API needs to create an order and start payment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub order_ref: Uuid,
    pub owner_id: Option<String>,
    pub line_items: Vec<CartLineItem>,
    pub address_info: AddressInfo,
    pub shipping_label: String,
    pub totals: OrderTotals,
    pub contact_email: String,
    pub customer_display_name: String,
    pub coupon_code: Option<String>,
    pub placed_at: DateTime<Utc>,
}

/// Fields gathered by checkout before the payload is stamped.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub owner_id: Option<String>,
    pub line_items: Vec<CartLineItem>,
    pub address_info: AddressInfo,
    pub shipping_label: String,
    pub totals: OrderTotals,
    pub contact_email: String,
    pub customer_display_name: String,
    pub coupon_code: Option<String>,
}

impl OrderPayload {
    pub fn assemble(draft: OrderDraft) -> Self {
        Self {
            order_ref: Uuid::now_v7(),
            owner_id: draft.owner_id, line_items: draft.line_items, address_info: draft.address_info,
            shipping_label: draft.shipping_label, totals: draft.totals, contact_email: draft.contact_email,
            customer_display_name: draft.customer_display_name, coupon_code: draft.coupon_code,
            placed_at: Utc::now(),
        }
    }

    pub fn is_guest(&self) -> bool { self.owner_id.is_none() }
}

/// Result of a successful order creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInitiation {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default, rename = "approvalURL")]
    pub approval_url: Option<String>,
}
