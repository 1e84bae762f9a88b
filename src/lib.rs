//! Storefront Cart
//!
//! Guest and account cart reconciliation plus checkout pricing for the storefront.
//!
//! ## Features
//! - Session-scoped guest carts behind a pluggable storage port
//! - Account carts held by the remote cart API
//! - One-time, resumable guest to account merge on login
//! - Order totals from sale prices, shipping tiers and coupons
//! - Checkout validation and order payload assembly

pub mod api;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod publisher;
pub mod pricing;
pub mod remote;
pub mod service;
pub mod storage;

use thiserror::Error;

use crate::checkout::CheckoutError;
use crate::remote::RemoteError;
use crate::storage::StorageError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("Another update for {0} is still in progress")]
    MutationInFlight(String),

    #[error("Cart merge stopped after {merged} line(s), {remaining} left in the guest cart: {source}")]
    MergeInterrupted {
        merged: usize,
        remaining: usize,
        #[source]
        source: RemoteError,
    },

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
