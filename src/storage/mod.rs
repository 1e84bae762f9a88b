//! Session-scoped storage port and the guest cart store built on it.

mod guest;
mod memory;
mod postgres;

pub use guest::GuestCartStore;
pub use memory::MemorySessionStorage;
pub use postgres::PgSessionStorage;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Backend(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// String key/value storage scoped to browsing sessions, the server-side
/// counterpart of a browser's session storage.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    async fn remove(&self, key: &str) -> StorageResult<()>;
}
