//! HTTP clients for the storefront cart and order endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Envelope, OrderCreateResponse, OrderGateway, RemoteCartApi, RemoteError, RemoteResult};
use crate::domain::aggregates::{Cart, OrderInitiation, OrderPayload};
use crate::domain::value_objects::LineKey;

/// Path segment used for lines without a size.
const NO_SIZE_SEGMENT: &str = "none";

fn build_client(timeout: Duration) -> RemoteResult<Client> {
    Client::builder().timeout(timeout).build().map_err(|e| RemoteError::Network(e.to_string()))
}

fn parse_base(base_url: &str) -> RemoteResult<Url> {
    let url = Url::parse(base_url).map_err(|e| RemoteError::Parse(format!("invalid base url {base_url}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(RemoteError::Parse(format!("invalid base url {base_url}")));
    }
    Ok(url)
}

fn join(base: &Url, segments: &[&str]) -> RemoteResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RemoteError::Parse(format!("invalid base url {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn map_send_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Network(format!("request timed out: {e}"))
    } else {
        RemoteError::Network(e.to_string())
    }
}

/// Sends the request and decodes the body, turning non-2xx answers into [`RemoteError::Service`].
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> RemoteResult<T> {
    let response = request.send().await.map_err(map_send_error)?;
    let status = response.status();
    let body = response.text().await.map_err(map_send_error)?;
    if !status.is_success() {
        let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
            .ok()
            .and_then(|env| env.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        return Err(RemoteError::Service { status: status.as_u16(), message });
    }
    serde_json::from_str(&body).map_err(|e| RemoteError::Parse(e.to_string()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartLineRequest<'a> {
    owner_id: &'a str,
    product_id: &'a str,
    size: Option<&'a str>,
    quantity: i64,
}

/// Client for the account cart endpoints of the storefront API.
#[derive(Clone)]
pub struct HttpRemoteCart {
    client: Client,
    base_url: Url,
}

impl HttpRemoteCart {
    /// # Arguments
    /// * `base_url` - Root of the storefront API (e.g., "http://shop-api:5000/api/shop")
    /// * `timeout` - Upper bound for a single request
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        Ok(Self { client: build_client(timeout)?, base_url: parse_base(base_url)? })
    }

    async fn call(&self, request: RequestBuilder) -> RemoteResult<Cart> {
        send::<Envelope<Cart>>(request).await?.into_result()
    }
}

#[async_trait]
impl RemoteCartApi for HttpRemoteCart {
    async fn fetch(&self, user_id: &str) -> RemoteResult<Cart> {
        let url = join(&self.base_url, &["cart", "get", user_id])?;
        tracing::debug!(%url, "fetching account cart");
        self.call(self.client.get(url)).await
    }

    async fn add(&self, user_id: &str, key: &LineKey, quantity: u32) -> RemoteResult<Cart> {
        let url = join(&self.base_url, &["cart", "add"])?;
        let body = CartLineRequest { owner_id: user_id, product_id: &key.product_id, size: key.size(), quantity: i64::from(quantity) };
        self.call(self.client.post(url).json(&body)).await
    }

    async fn set_quantity(&self, user_id: &str, key: &LineKey, quantity: i64) -> RemoteResult<Cart> {
        let url = join(&self.base_url, &["cart", "update-cart"])?;
        let body = CartLineRequest { owner_id: user_id, product_id: &key.product_id, size: key.size(), quantity };
        self.call(self.client.put(url).json(&body)).await
    }

    async fn remove(&self, user_id: &str, key: &LineKey) -> RemoteResult<Cart> {
        let size = key.size().unwrap_or(NO_SIZE_SEGMENT);
        let url = join(&self.base_url, &["cart", user_id, key.product_id.as_str(), size])?;
        self.call(self.client.delete(url)).await
    }
}

/// Client for `POST /order/create`.
#[derive(Clone)]
pub struct HttpOrderGateway {
    client: Client,
    base_url: Url,
}

impl HttpOrderGateway {
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        Ok(Self { client: build_client(timeout)?, base_url: parse_base(base_url)? })
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    async fn create_order(&self, payload: &OrderPayload) -> RemoteResult<OrderInitiation> {
        let url = join(&self.base_url, &["order", "create"])?;
        tracing::info!(order_ref = %payload.order_ref, total = %payload.totals.total, "creating order");
        send::<OrderCreateResponse>(self.client.post(url).json(payload)).await?.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_escapes_segments() {
        let base = parse_base("http://api.local/api/shop/").unwrap();
        let url = join(&base, &["cart", "U 1", "P/1", "M"]).unwrap();
        assert_eq!(url.as_str(), "http://api.local/api/shop/cart/U%201/P%2F1/M");
    }

    #[test]
    fn test_join_without_trailing_slash() {
        let base = parse_base("http://api.local/api").unwrap();
        assert_eq!(join(&base, &["cart", "add"]).unwrap().as_str(), "http://api.local/api/cart/add");
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(parse_base("mailto:shop@example.com").is_err());
        assert!(parse_base("not a url").is_err());
    }

    #[test]
    fn test_line_request_body() {
        let body = CartLineRequest { owner_id: "U1", product_id: "P1", size: None, quantity: 2 };
        assert_eq!(serde_json::to_value(&body).unwrap(), serde_json::json!({"ownerId": "U1", "productId": "P1", "size": null, "quantity": 2}));
    }
}
