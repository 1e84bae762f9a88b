//! In-memory stand-ins for the storefront API, with failure injection for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{OrderGateway, RemoteCartApi, RemoteError, RemoteResult};
use crate::domain::aggregates::{Cart, OrderInitiation, OrderPayload, ProductSnapshot};
use crate::domain::value_objects::{LineKey, Quantity};

/// A call observed by [`InMemoryRemoteCart`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteCall {
    Fetch { user_id: String },
    Add { user_id: String, key: LineKey, quantity: u32 },
    SetQuantity { user_id: String, key: LineKey, quantity: i64 },
    Remove { user_id: String, key: LineKey },
}

/// Account carts kept in memory with the server's merge semantics.
#[derive(Default)]
pub struct InMemoryRemoteCart {
    carts: RwLock<HashMap<String, Cart>>,
    catalog: RwLock<HashMap<String, ProductSnapshot>>,
    calls: RwLock<Vec<RemoteCall>>,
    adds_before_failure: RwLock<Option<usize>>,
    unavailable: RwLock<bool>,
}

impl InMemoryRemoteCart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Product data used to hydrate lines added to account carts.
    pub async fn register_product(&self, product_id: &str, snapshot: ProductSnapshot) {
        self.catalog.write().await.insert(product_id.to_string(), snapshot);
    }

    /// Lets the next `count` adds succeed and fails every add after that.
    pub async fn fail_adds_after(&self, count: Option<usize>) {
        *self.adds_before_failure.write().await = count;
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.calls.read().await.clone()
    }

    pub async fn add_calls(&self) -> Vec<RemoteCall> {
        self.calls.read().await.iter().filter(|c| matches!(c, RemoteCall::Add { .. })).cloned().collect()
    }

    pub async fn cart(&self, user_id: &str) -> Cart {
        self.carts.read().await.get(user_id).cloned().unwrap_or_else(|| Cart::for_owner(user_id))
    }

    async fn record(&self, call: RemoteCall) -> RemoteResult<()> {
        self.calls.write().await.push(call);
        if *self.unavailable.read().await {
            return Err(RemoteError::Network("remote cart unavailable".to_string()));
        }
        Ok(())
    }

    async fn mutate(&self, user_id: &str, f: impl FnOnce(&mut Cart)) -> Cart {
        let mut carts = self.carts.write().await;
        let cart = carts.entry(user_id.to_string()).or_insert_with(|| Cart::for_owner(user_id));
        f(cart);
        cart.clone()
    }
}

#[async_trait]
impl RemoteCartApi for InMemoryRemoteCart {
    async fn fetch(&self, user_id: &str) -> RemoteResult<Cart> {
        self.record(RemoteCall::Fetch { user_id: user_id.to_string() }).await?;
        Ok(self.cart(user_id).await)
    }

    async fn add(&self, user_id: &str, key: &LineKey, quantity: u32) -> RemoteResult<Cart> {
        self.record(RemoteCall::Add { user_id: user_id.to_string(), key: key.clone(), quantity }).await?;
        {
            let mut budget = self.adds_before_failure.write().await;
            match *budget {
                Some(0) => return Err(RemoteError::Service { status: 503, message: "add failed".to_string() }),
                Some(ref mut left) => *left -= 1,
                None => {}
            }
        }
        let quantity = Quantity::new(quantity).map_err(|e| RemoteError::Rejected(e.to_string()))?;
        let snapshot = self.catalog.read().await.get(&key.product_id).cloned().unwrap_or_default();
        Ok(self.mutate(user_id, |cart| cart.add_item(key, quantity, &snapshot)).await)
    }

    async fn set_quantity(&self, user_id: &str, key: &LineKey, quantity: i64) -> RemoteResult<Cart> {
        self.record(RemoteCall::SetQuantity { user_id: user_id.to_string(), key: key.clone(), quantity }).await?;
        Ok(self.mutate(user_id, |cart| { cart.set_quantity(key, quantity); }).await)
    }

    async fn remove(&self, user_id: &str, key: &LineKey) -> RemoteResult<Cart> {
        self.record(RemoteCall::Remove { user_id: user_id.to_string(), key: key.clone() }).await?;
        Ok(self.mutate(user_id, |cart| { cart.remove_item(key); }).await)
    }
}

/// Order gateway that accepts every order unless told to fail.
#[derive(Default)]
pub struct InMemoryOrderGateway {
    orders: RwLock<Vec<OrderPayload>>,
    fail_with: RwLock<Option<String>>,
}

impl InMemoryOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failure(&self, message: Option<&str>) {
        *self.fail_with.write().await = message.map(str::to_string);
    }

    pub async fn orders(&self) -> Vec<OrderPayload> {
        self.orders.read().await.clone()
    }
}

#[async_trait]
impl OrderGateway for InMemoryOrderGateway {
    async fn create_order(&self, payload: &OrderPayload) -> RemoteResult<OrderInitiation> {
        if let Some(message) = self.fail_with.read().await.clone() {
            return Err(RemoteError::Rejected(message));
        }
        self.orders.write().await.push(payload.clone());
        Ok(OrderInitiation {
            order_id: Some(payload.order_ref.to_string()),
            approval_url: Some(format!("/checkout/confirmation/{}", payload.order_ref)),
        })
    }
}
