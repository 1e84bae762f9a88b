//! Cart reconciliation
//!
//! Every cart read and write goes through [`SessionCart`], which routes it to
//! the session's guest cart or to the user's account cart depending on whether
//! an owner id is present, and folds the guest cart into the account cart once
//! the shopper signs in.

mod in_flight;
mod session_lock;
mod stores;

pub use in_flight::{InFlight, InFlightGuard, Slot};
pub use session_lock::{SessionLockGuard, SessionLocks};
pub use stores::{AccountCartStore, CartStore};

use std::sync::Arc;

use chrono::Utc;

use crate::domain::aggregates::{Cart, ProductSnapshot};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{LineKey, Quantity};
use crate::publisher::{EventPublisher, LogPublisher};
use crate::remote::RemoteCartApi;
use crate::storage::{GuestCartStore, SessionStorage};
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct CartService {
    storage: Arc<dyn SessionStorage>,
    remote: Arc<dyn RemoteCartApi>,
    publisher: Arc<dyn EventPublisher>,
    in_flight: Arc<InFlight>,
    session_locks: Arc<SessionLocks>,
}

impl CartService {
    pub fn new(storage: Arc<dyn SessionStorage>, remote: Arc<dyn RemoteCartApi>) -> Self {
        Self {
            storage,
            remote,
            publisher: Arc::new(LogPublisher),
            in_flight: Arc::new(InFlight::new()),
            session_locks: Arc::new(SessionLocks::new()),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Cart operations on behalf of one browsing session.
    pub fn session(&self, session_id: &str) -> SessionCart<'_> {
        SessionCart {
            service: self,
            session_id: session_id.to_string(),
            guest: GuestCartStore::new(self.storage.clone(), session_id),
        }
    }
}

pub struct SessionCart<'a> {
    service: &'a CartService,
    session_id: String,
    guest: GuestCartStore,
}

impl SessionCart<'_> {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn store(&self, owner_id: Option<&str>) -> Box<dyn CartStore> {
        match owner_id {
            Some(user_id) => Box::new(AccountCartStore::new(self.service.remote.clone(), user_id)),
            None => Box::new(self.guest.clone()),
        }
    }

    fn slot(&self, owner_id: Option<&str>, key: &LineKey) -> Slot {
        match owner_id {
            Some(user_id) => Slot::Account { user_id: user_id.to_string(), key: key.clone() },
            None => Slot::Guest { session_id: self.session_id.clone(), key: key.clone() },
        }
    }

    /// Guest writes and merges of one session run one at a time.
    async fn lock_guest(&self, owner_id: Option<&str>) -> Option<SessionLockGuard<'_>> {
        match owner_id {
            Some(_) => None,
            None => Some(self.service.session_locks.acquire(&self.session_id).await),
        }
    }

    pub async fn add_item(&self, owner_id: Option<&str>, product_id: &str, size: Option<&str>, quantity: u32, snapshot: &ProductSnapshot) -> Result<Cart> {
        let quantity = Quantity::new(quantity).map_err(|_| StorefrontError::InvalidQuantity)?;
        let key = LineKey::new(product_id, size);
        let _guard = self.service.in_flight.acquire(self.slot(owner_id, &key))?;
        let _session = self.lock_guest(owner_id).await;
        let cart = self.store(owner_id).add(&key, quantity, snapshot).await?;
        tracing::debug!(session = %self.session_id, owner = ?owner_id, %key, quantity = quantity.value(), "cart item added");
        Ok(cart)
    }

    pub async fn set_quantity(&self, owner_id: Option<&str>, product_id: &str, size: Option<&str>, quantity: i64) -> Result<Cart> {
        let key = LineKey::new(product_id, size);
        let _guard = self.service.in_flight.acquire(self.slot(owner_id, &key))?;
        let _session = self.lock_guest(owner_id).await;
        let cart = self.store(owner_id).set_quantity(&key, quantity).await?;
        tracing::debug!(session = %self.session_id, owner = ?owner_id, %key, quantity, "cart quantity set");
        Ok(cart)
    }

    pub async fn remove_item(&self, owner_id: Option<&str>, product_id: &str, size: Option<&str>) -> Result<Cart> {
        let key = LineKey::new(product_id, size);
        let _guard = self.service.in_flight.acquire(self.slot(owner_id, &key))?;
        let _session = self.lock_guest(owner_id).await;
        let cart = self.store(owner_id).remove(&key).await?;
        tracing::debug!(session = %self.session_id, owner = ?owner_id, %key, "cart item removed");
        Ok(cart)
    }

    pub async fn fetch(&self, owner_id: Option<&str>) -> Result<Cart> {
        self.store(owner_id).fetch().await
    }

    /// Moves the session's guest cart into `user_id`'s account cart and returns the merged account cart.
    ///
    /// Lines are added one at a time in guest-cart order. Each line leaves the
    /// guest cart as soon as the server accepts it, so a failed merge can be
    /// retried without adding any line twice. With an empty guest cart this is
    /// just a fetch.
    /// Guest writes for the session wait until the merge is over.
    ///
    /// # Errors
    ///
    /// - [`StorefrontError::MergeInterrupted`]: an add failed; the remaining lines stay in the guest cart.
    /// - [`StorefrontError::MutationInFlight`]: a merge for this session is already running.
    /// - [`StorefrontError::Remote`]: the final fetch failed.
    pub async fn merge_on_login(&self, user_id: &str) -> Result<Cart> {
        let _guard = self.service.in_flight.acquire(Slot::Merge { session_id: self.session_id.clone() })?;
        let _session = self.service.session_locks.acquire(&self.session_id).await;
        let account = AccountCartStore::new(self.service.remote.clone(), user_id);
        let mut guest = self.guest.load().await;
        if guest.is_empty() {
            tracing::debug!(session = %self.session_id, user_id, "no guest cart to merge");
            return account.fetch().await;
        }

        let lines = guest.items().to_vec();
        let mut merged = 0usize;
        for line in lines {
            let key = line.key();
            if line.quantity > 0 {
                if let Err(source) = self.service.remote.add(user_id, &key, line.quantity).await {
                    let remaining = guest.item_count();
                    tracing::warn!(session = %self.session_id, user_id, %key, merged, remaining, error = %source, "cart merge interrupted");
                    self.service.publisher.publish(DomainEvent::Cart(CartEvent::MergeInterrupted {
                        user_id: user_id.to_string(), lines_merged: merged, lines_remaining: remaining, at: Utc::now(),
                    })).await;
                    return Err(StorefrontError::MergeInterrupted { merged, remaining, source });
                }
                merged += 1;
            }
            guest.remove_item(&key);
            self.guest.save(&guest).await;
        }

        self.guest.clear().await;
        tracing::info!(session = %self.session_id, user_id, merged, "guest cart merged into account cart");
        self.service.publisher.publish(DomainEvent::Cart(CartEvent::Merged {
            user_id: user_id.to_string(), lines_merged: merged, at: Utc::now(),
        })).await;
        account.fetch().await
    }
}
