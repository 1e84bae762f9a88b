//! Postgres-backed session storage.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{SessionStorage, StorageResult};

#[derive(Clone)]
pub struct PgSessionStorage {
    db: PgPool,
}

impl PgSessionStorage {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Drops entries untouched for longer than `max_age_secs`; session data is not meant to outlive the visit.
    pub async fn purge_older_than(&self, max_age_secs: i64) -> StorageResult<u64> {
        let done = sqlx::query("DELETE FROM session_storage WHERE updated_at < NOW() - make_interval(secs => $1)")
            .bind(max_age_secs as f64)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl SessionStorage for PgSessionStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM session_storage WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        sqlx::query("INSERT INTO session_storage (key, value, updated_at) VALUES ($1, $2, NOW()) ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()")
            .bind(key)
            .bind(value)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM session_storage WHERE key = $1").bind(key).execute(&self.db).await?;
        Ok(())
    }
}
