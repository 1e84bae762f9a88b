//! Guest cart persisted in session storage.

use std::sync::Arc;

use crate::domain::aggregates::Cart;

use super::SessionStorage;

const KEY_PREFIX: &str = "guest_cart:";

/// The cart of one anonymous browsing session.
///
/// Read and write failures never reach the caller: an unreadable cart loads
/// as empty and a failed write is only logged.
#[derive(Clone)]
pub struct GuestCartStore {
    storage: Arc<dyn SessionStorage>,
    key: String,
}

impl GuestCartStore {
    pub fn new(storage: Arc<dyn SessionStorage>, session_id: &str) -> Self {
        Self { storage, key: format!("{KEY_PREFIX}{session_id}") }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn load(&self) -> Cart {
        let raw = match self.storage.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Cart::guest(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "guest cart read failed, treating as empty");
                return Cart::guest();
            }
        };
        match serde_json::from_str::<Cart>(&raw) {
            Ok(cart) => cart,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "guest cart data corrupt, treating as empty");
                Cart::guest()
            }
        }
    }

    pub async fn save(&self, cart: &Cart) {
        let raw = match serde_json::to_string(cart) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "guest cart serialization failed");
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.key, &raw).await {
            tracing::error!(key = %self.key, error = %e, "guest cart save failed");
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.storage.remove(&self.key).await {
            tracing::error!(key = %self.key, error = %e, "guest cart clear failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ProductSnapshot;
    use crate::domain::value_objects::{LineKey, Quantity};
    use crate::storage::MemorySessionStorage;

    fn cart_with_one_line() -> Cart {
        let mut cart = Cart::guest();
        cart.add_item(&LineKey::new("P1", Some("M")), Quantity::new(2).unwrap(), &ProductSnapshot::default());
        cart
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let store = GuestCartStore::new(Arc::new(MemorySessionStorage::new()), "s1");
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = GuestCartStore::new(Arc::new(MemorySessionStorage::new()), "s1");
        store.save(&cart_with_one_line()).await;
        assert_eq!(store.load().await, cart_with_one_line());
        store.clear().await;
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_data_loads_empty() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage.insert_raw("guest_cart:s1", "{not json").await;
        let store = GuestCartStore::new(storage, "s1");
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_is_swallowed() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage.set_fail_writes(true).await;
        let store = GuestCartStore::new(storage.clone(), "s1");
        store.save(&cart_with_one_line()).await;
        store.clear().await;
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let storage: Arc<dyn SessionStorage> = Arc::new(MemorySessionStorage::new());
        let a = GuestCartStore::new(storage.clone(), "a");
        let b = GuestCartStore::new(storage, "b");
        a.save(&cart_with_one_line()).await;
        assert!(b.load().await.is_empty());
        assert_eq!(a.key(), "guest_cart:a");
    }
}
