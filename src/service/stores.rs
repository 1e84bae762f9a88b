//! The two cart backends behind [`CartStore`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::aggregates::{Cart, ProductSnapshot};
use crate::domain::value_objects::{LineKey, Quantity};
use crate::remote::RemoteCartApi;
use crate::storage::GuestCartStore;
use crate::Result;

/// Cart operations independent of where the cart is kept.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn fetch(&self) -> Result<Cart>;
    async fn add(&self, key: &LineKey, quantity: Quantity, snapshot: &ProductSnapshot) -> Result<Cart>;
    async fn set_quantity(&self, key: &LineKey, quantity: i64) -> Result<Cart>;
    async fn remove(&self, key: &LineKey) -> Result<Cart>;
}

#[async_trait]
impl CartStore for GuestCartStore {
    async fn fetch(&self) -> Result<Cart> {
        Ok(self.load().await)
    }

    async fn add(&self, key: &LineKey, quantity: Quantity, snapshot: &ProductSnapshot) -> Result<Cart> {
        let mut cart = self.load().await;
        cart.add_item(key, quantity, snapshot);
        self.save(&cart).await;
        Ok(cart)
    }

    async fn set_quantity(&self, key: &LineKey, quantity: i64) -> Result<Cart> {
        let mut cart = self.load().await;
        if cart.set_quantity(key, quantity) {
            self.save(&cart).await;
        } else {
            tracing::debug!(%key, "no guest cart line to update");
        }
        Ok(cart)
    }

    async fn remove(&self, key: &LineKey) -> Result<Cart> {
        let mut cart = self.load().await;
        if cart.remove_item(key) {
            self.save(&cart).await;
        } else {
            tracing::debug!(%key, "no guest cart line to remove");
        }
        Ok(cart)
    }
}

/// A signed-in user's cart, held by the remote cart API.
pub struct AccountCartStore {
    api: Arc<dyn RemoteCartApi>,
    user_id: String,
}

impl AccountCartStore {
    pub fn new(api: Arc<dyn RemoteCartApi>, user_id: impl Into<String>) -> Self {
        Self { api, user_id: user_id.into() }
    }
}

#[async_trait]
impl CartStore for AccountCartStore {
    async fn fetch(&self) -> Result<Cart> {
        Ok(self.api.fetch(&self.user_id).await?)
    }

    /// The snapshot is not sent; the server hydrates lines from its catalog.
    async fn add(&self, key: &LineKey, quantity: Quantity, _snapshot: &ProductSnapshot) -> Result<Cart> {
        Ok(self.api.add(&self.user_id, key, quantity.value()).await?)
    }

    async fn set_quantity(&self, key: &LineKey, quantity: i64) -> Result<Cart> {
        Ok(self.api.set_quantity(&self.user_id, key, quantity).await?)
    }

    async fn remove(&self, key: &LineKey) -> Result<Cart> {
        Ok(self.api.remove(&self.user_id, key).await?)
    }
}
