//! Durable key/value storage for the history log and preferences.
//!
//! Values are opaque JSON documents. The PostgreSQL implementation keeps them
//! in the `keg_store` table created by `schema`; [`MemoryStore`] backs tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, PgPool};

// ---

/// Storage key holding the pour history array.
pub const HISTORY_KEY: &str = "beer_keg_history";

/// Storage key holding `{display_units, keg_config}`.
pub const PREFS_KEY: &str = "beer_keg_prefs";

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Load the document stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the document stored under `key`.
    async fn save(&self, key: &str, value: &Value) -> Result<()>;
}

/// One row of `keg_store`.
#[derive(Debug, sqlx::FromRow)]
struct StoredDocument {
    // ---
    key: String,
    value: Json<Value>,
    updated_at: DateTime<Utc>,
}

/// [`KvStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KvStore for PgStore {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        // ---
        let row: Option<StoredDocument> =
            sqlx::query_as("SELECT key, value, updated_at FROM keg_store WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Failed to load '{key}' from keg_store"))?;

        Ok(row.map(|doc| {
            tracing::trace!("Loaded '{}' (updated {})", doc.key, doc.updated_at);
            doc.value.0
        }))
    }

    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO keg_store (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(Json(value))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save '{key}' to keg_store"))?;

        Ok(())
    }
}

#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use std::{collections::HashMap, sync::Arc};

    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Mutex;

    use super::KvStore;

    /// In-process [`KvStore`] backing the unit tests.
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        documents: Arc<Mutex<HashMap<String, Value>>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populate a document.
        pub async fn insert(&self, key: &str, value: Value) {
            self.documents.lock().await.insert(key.to_string(), value);
        }
    }

    #[async_trait]
    impl KvStore for MemoryStore {
        async fn load(&self, key: &str) -> Result<Option<Value>> {
            Ok(self.documents.lock().await.get(key).cloned())
        }

        async fn save(&self, key: &str, value: &Value) -> Result<()> {
            self.insert(key, value.clone()).await;
            Ok(())
        }
    }
}
