//! Clients for the external cart and order APIs.
//!
//! The account cart lives on the storefront API; this crate only consumes it.
//! Both APIs answer with a `{success, data}` or `{success, message}` envelope.

mod http;
mod memory;

pub use http::{HttpOrderGateway, HttpRemoteCart};
pub use memory::{InMemoryOrderGateway, InMemoryRemoteCart, RemoteCall};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::aggregates::{Cart, OrderInitiation, OrderPayload};
use crate::domain::value_objects::LineKey;

/// Error from remote API calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),
    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("parse error: {0}")]
    Parse(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Account cart operations offered by the storefront API, keyed by user id.
#[async_trait]
pub trait RemoteCartApi: Send + Sync {
    async fn fetch(&self, user_id: &str) -> RemoteResult<Cart>;
    /// The server merges into an existing line with the same key.
    async fn add(&self, user_id: &str, key: &LineKey, quantity: u32) -> RemoteResult<Cart>;
    /// A quantity of zero or less removes the line.
    async fn set_quantity(&self, user_id: &str, key: &LineKey, quantity: i64) -> RemoteResult<Cart>;
    async fn remove(&self, user_id: &str, key: &LineKey) -> RemoteResult<Cart>;
}

/// Order creation and payment initiation.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn create_order(&self, payload: &OrderPayload) -> RemoteResult<OrderInitiation>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn into_result(self) -> RemoteResult<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(RemoteError::Parse("response has no data".to_string())),
            (false, _) => Err(RemoteError::Rejected(self.message.unwrap_or_else(|| "request failed".to_string()))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderCreateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    initiation: OrderInitiation,
}

impl OrderCreateResponse {
    fn into_result(self) -> RemoteResult<OrderInitiation> {
        if self.success {
            Ok(self.initiation)
        } else {
            Err(RemoteError::Rejected(self.message.unwrap_or_else(|| "order creation failed".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success() {
        let env: Envelope<Cart> = serde_json::from_str(r#"{"success":true,"data":{"ownerId":"U1","items":[{"productId":"P1","size":"M","quantity":2,"price":10}]}}"#).unwrap();
        let cart = env.into_result().unwrap();
        assert_eq!(cart.owner_id(), Some("U1"));
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_envelope_failure_message() {
        let env: Envelope<Cart> = serde_json::from_str(r#"{"success":false,"message":"Cart not found"}"#).unwrap();
        assert_eq!(env.into_result(), Err(RemoteError::Rejected("Cart not found".to_string())));
    }

    #[test]
    fn test_order_response() {
        let ok: OrderCreateResponse = serde_json::from_str(r#"{"success":true,"approvalURL":"https://pay/x","orderId":"O1"}"#).unwrap();
        let init = ok.into_result().unwrap();
        assert_eq!(init.approval_url.as_deref(), Some("https://pay/x"));
        assert_eq!(init.order_id.as_deref(), Some("O1"));
        let failed: OrderCreateResponse = serde_json::from_str(r#"{"success":false,"message":"Out of stock"}"#).unwrap();
        assert_eq!(failed.into_result(), Err(RemoteError::Rejected("Out of stock".to_string())));
    }
}
