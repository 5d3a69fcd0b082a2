//! Thumbnail side-channel: fetches the image blob referenced by an asset's
//! `image_id`, tolerating both a plain string-id lookup and an opaque
//! object-id lookup form used by older catalog entries.

use async_trait::async_trait;
use bytes::Bytes;
use connector_core::{ConnectorError, ConnectorResult};

#[async_trait]
pub trait ThumbnailStore: Send + Sync {
    async fn fetch(&self, image_id: &str) -> ConnectorResult<Bytes>;
}

pub struct HttpThumbnailStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpThumbnailStore {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn get(&self, path: &str) -> Option<Bytes> {
        let response = self.client.get(path).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.bytes().await.ok()
    }
}

#[async_trait]
impl ThumbnailStore for HttpThumbnailStore {
    async fn fetch(&self, image_id: &str) -> ConnectorResult<Bytes> {
        let by_string_id = format!("{}/thumbnails/{image_id}", self.base_url);
        if let Some(bytes) = self.get(&by_string_id).await {
            return Ok(bytes);
        }

        let by_object_id = format!("{}/objects/{image_id}/thumbnail", self.base_url);
        if let Some(bytes) = self.get(&by_object_id).await {
            return Ok(bytes);
        }

        Err(ConnectorError::ThumbnailUnavailable(image_id.to_string()))
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct InMemoryThumbnailStore {
        blobs: HashMap<String, Bytes>,
    }

    impl InMemoryThumbnailStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, image_id: impl Into<String>, bytes: Vec<u8>) -> Self {
            self.blobs.insert(image_id.into(), Bytes::from(bytes));
            self
        }
    }

    #[async_trait]
    impl ThumbnailStore for InMemoryThumbnailStore {
        async fn fetch(&self, image_id: &str) -> ConnectorResult<Bytes> {
            self.blobs
                .get(image_id)
                .cloned()
                .ok_or_else(|| ConnectorError::ThumbnailUnavailable(image_id.to_string()))
        }
    }
}
