//! Mapping Store: read-only lookup of a registry entry's `mapping_id` into
//! the concrete destination it should publish to. Mappings are immutable
//! from the core's perspective.

use async_trait::async_trait;
use connector_core::{ConnectorError, ConnectorResult, MappingRecord, TargetPlatform};
use sqlx::PgPool;

#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn get(&self, mapping_id: &str) -> ConnectorResult<MappingRecord>;
}

#[derive(Clone)]
pub struct PgMappingStore {
    pool: PgPool,
}

impl PgMappingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MappingRow {
    mapping_id: String,
    target_id: String,
    target_platform: String,
    category_id: String,
}

impl TryFrom<MappingRow> for MappingRecord {
    type Error = ConnectorError;

    fn try_from(row: MappingRow) -> Result<Self, Self::Error> {
        let target_platform = match row.target_platform.as_str() {
            "facebook" => TargetPlatform::Facebook,
            "youtube" => TargetPlatform::Youtube,
            "youtube_direct" => TargetPlatform::YoutubeDirect,
            other => {
                return Err(ConnectorError::AssetMalformed(format!(
                    "unknown target_platform '{other}' for mapping {}",
                    row.mapping_id
                )))
            }
        };

        Ok(MappingRecord {
            mapping_id: row.mapping_id,
            target_id: row.target_id,
            target_platform,
            category_id: row.category_id,
        })
    }
}

#[async_trait]
impl MappingStore for PgMappingStore {
    async fn get(&self, mapping_id: &str) -> ConnectorResult<MappingRecord> {
        let row: Option<MappingRow> = sqlx::query_as(
            "SELECT mapping_id, target_id, target_platform, category_id FROM mappings WHERE mapping_id = $1",
        )
        .bind(mapping_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ConnectorError::persist_failure(mapping_id, "mapping lookup failed", e))?;

        let row = row.ok_or_else(|| ConnectorError::NotFound(mapping_id.to_string()))?;
        row.try_into()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::InMemoryMappingStore;
    use super::*;

    #[tokio::test]
    async fn get_missing_mapping_returns_not_found() {
        let store = InMemoryMappingStore::new();
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, ConnectorError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_returns_seeded_record() {
        let store = InMemoryMappingStore::new().with(MappingRecord {
            mapping_id: "m1".into(),
            target_id: "token-1".into(),
            target_platform: TargetPlatform::Facebook,
            category_id: "c1".into(),
        });
        let record = store.get("m1").await.unwrap();
        assert_eq!(record.target_id, "token-1");
    }
}
