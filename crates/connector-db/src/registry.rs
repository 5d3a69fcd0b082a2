//! Registry Store: durable key/value of workflow records, keyed by
//! `registry_id`, backed by a single JSONB-payload table so the whole entry
//! can be upserted atomically without a hand-maintained column list.

use async_trait::async_trait;
use connector_core::{ConnectorError, ConnectorResult, RegistryEntry};
use sqlx::PgPool;

#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn load(&self, registry_id: &str) -> ConnectorResult<RegistryEntry>;
    async fn save(&self, entry: &RegistryEntry) -> ConnectorResult<()>;
}

#[derive(Clone)]
pub struct PgRegistryStore {
    pool: PgPool,
}

impl PgRegistryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistryStore for PgRegistryStore {
    async fn load(&self, registry_id: &str) -> ConnectorResult<RegistryEntry> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT payload FROM registry_entries WHERE registry_id = $1")
                .bind(registry_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    ConnectorError::persist_failure(registry_id, "load failed", e)
                })?;

        let (payload,) = row.ok_or_else(|| ConnectorError::NotFound(registry_id.to_string()))?;
        serde_json::from_value(payload).map_err(|e| {
            ConnectorError::persist_failure(registry_id, "stored payload is not a valid registry entry", e)
        })
    }

    async fn save(&self, entry: &RegistryEntry) -> ConnectorResult<()> {
        let payload = serde_json::to_value(entry).map_err(|e| {
            ConnectorError::persist_failure(&entry.registry_id, "failed to serialize entry", e)
        })?;

        sqlx::query(
            r#"
            INSERT INTO registry_entries (registry_id, payload, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (registry_id)
            DO UPDATE SET payload = EXCLUDED.payload, updated_at = now()
            "#,
        )
        .bind(&entry.registry_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| ConnectorError::persist_failure(&entry.registry_id, "upsert failed", e))?;

        tracing::info!(
            registry_id = %entry.registry_id,
            status = ?entry.status,
            intermediate_state = ?entry.intermediate_state,
            "registry entry saved"
        );

        Ok(())
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    /// In-memory `RegistryStore` used across `connector-engine`'s unit tests.
    #[derive(Default)]
    pub struct InMemoryRegistryStore {
        entries: RwLock<HashMap<String, RegistryEntry>>,
    }

    impl InMemoryRegistryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seeded(entry: RegistryEntry) -> Self {
            let mut entries = HashMap::new();
            entries.insert(entry.registry_id.clone(), entry);
            Self {
                entries: RwLock::new(entries),
            }
        }
    }

    #[async_trait]
    impl RegistryStore for InMemoryRegistryStore {
        async fn load(&self, registry_id: &str) -> ConnectorResult<RegistryEntry> {
            self.entries
                .read()
                .await
                .get(registry_id)
                .cloned()
                .ok_or_else(|| ConnectorError::NotFound(registry_id.to_string()))
        }

        async fn save(&self, entry: &RegistryEntry) -> ConnectorResult<()> {
            self.entries
                .write()
                .await
                .insert(entry.registry_id.clone(), entry.clone());
            Ok(())
        }
    }
}
