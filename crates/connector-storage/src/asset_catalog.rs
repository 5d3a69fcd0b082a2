//! Asset Catalog: read-only lookup of a video's source metadata. The
//! catalog is an external system; this client is a narrow HTTP interface
//! onto it, matching the construction rules in the video descriptor.

use async_trait::async_trait;
use connector_core::{AssetRecord, ConnectorError, ConnectorResult};

#[async_trait]
pub trait AssetCatalog: Send + Sync {
    async fn fetch_video(&self, video_id: &str) -> ConnectorResult<AssetRecord>;
}

pub struct HttpAssetCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetCatalog {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AssetCatalog for HttpAssetCatalog {
    async fn fetch_video(&self, video_id: &str) -> ConnectorResult<AssetRecord> {
        let url = format!("{}/videos/{video_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ConnectorError::AssetNotFound(video_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(ConnectorError::TransientRemote(format!(
                "asset catalog returned {}",
                response.status()
            )));
        }

        response
            .json::<AssetRecord>()
            .await
            .map_err(|e| ConnectorError::AssetMalformed(e.to_string()))
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct InMemoryAssetCatalog {
        records: HashMap<String, AssetRecord>,
    }

    impl InMemoryAssetCatalog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, video_id: impl Into<String>, record: AssetRecord) -> Self {
            self.records.insert(video_id.into(), record);
            self
        }
    }

    #[async_trait]
    impl AssetCatalog for InMemoryAssetCatalog {
        async fn fetch_video(&self, video_id: &str) -> ConnectorResult<AssetRecord> {
            self.records
                .get(video_id)
                .cloned()
                .ok_or_else(|| ConnectorError::AssetNotFound(video_id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::InMemoryAssetCatalog;
    use super::*;

    #[tokio::test]
    async fn fetch_video_missing_returns_asset_not_found() {
        let catalog = InMemoryAssetCatalog::new();
        let err = catalog.fetch_video("v1").await.unwrap_err();
        assert!(matches!(err, ConnectorError::AssetNotFound(_)));
    }
}
