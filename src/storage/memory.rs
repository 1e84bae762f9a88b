//! In-process session storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SessionStorage, StorageError, StorageResult};

#[derive(Default)]
pub struct MemorySessionStorage {
    entries: RwLock<HashMap<String, String>>,
    fail_writes: RwLock<bool>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set`/`remove` fail until switched off again.
    pub async fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.write().await = fail;
    }

    /// Writes a raw value, bypassing the failure switch.
    pub async fn insert_raw(&self, key: &str, value: &str) {
        self.entries.write().await.insert(key.to_string(), value.to_string());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn check_writable(&self) -> StorageResult<()> {
        if *self.fail_writes.read().await {
            return Err(StorageError::Backend("memory storage write disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_writable().await?;
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.check_writable().await?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let storage = MemorySessionStorage::new();
        storage.set("k", "v").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));
        storage.remove("k").await.unwrap();
        assert!(storage.get("k").await.unwrap().is_none());
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let storage = MemorySessionStorage::new();
        storage.set_fail_writes(true).await;
        assert!(storage.set("k", "v").await.is_err());
        assert!(storage.remove("k").await.is_err());
        storage.insert_raw("k", "v").await;
        assert_eq!(storage.len().await, 1);
    }
}
