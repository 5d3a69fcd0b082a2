//! Real `YoutubeClient` backed by the YouTube Data API v3 and Content ID
//! Partner API, reached with a plain `reqwest::Client`.

use crate::youtube_common::{status_error, ChunkOutcome, RemoteSnippet, YoutubeClient};
use async_trait::async_trait;
use bytes::Bytes;
use connector_core::{ConnectorError, ConnectorResult, VideoDescriptor};
use serde_json::json;

pub struct LiveYoutubeClient {
    client: reqwest::Client,
    data_api_base_url: String,
    partner_api_base_url: String,
}

impl LiveYoutubeClient {
    pub fn new(
        client: reqwest::Client,
        data_api_base_url: impl Into<String>,
        partner_api_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            data_api_base_url: data_api_base_url.into(),
            partner_api_base_url: partner_api_base_url.into(),
        }
    }
}

#[async_trait]
impl YoutubeClient for LiveYoutubeClient {
    async fn content_owner_id(&self, access_token: &str) -> ConnectorResult<String> {
        let response = self
            .client
            .get(format!("{}/contentOwners", self.partner_api_base_url))
            .bearer_auth(access_token)
            .query(&[("fetchMine", "true")])
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_error(response.status().as_u16(), "contentOwners"));
        }

        #[derive(serde::Deserialize)]
        struct Item {
            id: String,
        }
        #[derive(serde::Deserialize)]
        struct Page {
            items: Vec<Item>,
        }
        let page: Page = response
            .json()
            .await
            .map_err(|e| ConnectorError::PermanentRemote(format!("malformed contentOwners response: {e}")))?;

        page.items
            .into_iter()
            .next()
            .map(|item| item.id)
            .ok_or_else(|| ConnectorError::PermanentRemote("no content owner returned".into()))
    }

    async fn start_resumable_upload(
        &self,
        access_token: &str,
        video: &VideoDescriptor,
        on_behalf_of_content_owner: Option<&str>,
        on_behalf_of_content_owner_channel: Option<&str>,
    ) -> ConnectorResult<String> {
        let mut query: Vec<(&str, &str)> = vec![("uploadType", "resumable"), ("part", "snippet,status")];
        if let Some(owner) = on_behalf_of_content_owner {
            query.push(("onBehalfOfContentOwner", owner));
        }
        if let Some(channel) = on_behalf_of_content_owner_channel {
            query.push(("onBehalfOfContentOwnerChannel", channel));
        }

        let body = json!({
            "snippet": {
                "title": video.title,
                "description": video.description,
                "tags": video.keywords,
                "categoryId": "22",
            },
            "status": { "privacyStatus": "private" },
        });

        let response = self
            .client
            .post(format!("{}/videos", self.data_api_base_url))
            .bearer_auth(access_token)
            .query(&query)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_error(response.status().as_u16(), "resumable upload init"));
        }

        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| ConnectorError::PermanentRemote("resumable session missing Location header".into()))
    }

    async fn upload_chunk(
        &self,
        upload_url: &str,
        offset: u64,
        chunk: Bytes,
        total_size: u64,
    ) -> ConnectorResult<ChunkOutcome> {
        let chunk_len = chunk.len() as u64;
        let content_range = format!("bytes {offset}-{}/{total_size}", offset + chunk_len - 1);

        let response = self
            .client
            .put(upload_url)
            .header("Content-Range", content_range)
            .body(chunk)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 308 {
            return Ok(ChunkOutcome::Incomplete {
                next_offset: offset + chunk_len,
            });
        }
        if !status.is_success() {
            return Err(status_error(status.as_u16(), "resumable chunk upload"));
        }

        #[derive(serde::Deserialize)]
        struct Raw {
            id: String,
        }
        let raw: Raw = response
            .json()
            .await
            .map_err(|e| ConnectorError::PermanentRemote(format!("malformed upload completion: {e}")))?;
        Ok(ChunkOutcome::Complete { video_id: raw.id })
    }

    async fn upload_thumbnail(&self, access_token: &str, video_id: &str, bytes: Bytes) -> ConnectorResult<()> {
        let response = self
            .client
            .post(format!("{}/thumbnails/set", self.data_api_base_url))
            .bearer_auth(access_token)
            .query(&[("videoId", video_id)])
            .body(bytes)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(status_error(response.status().as_u16(), "thumbnail upload"));
        }
        Ok(())
    }

    async fn get_snippet(&self, access_token: &str, video_id: &str) -> ConnectorResult<RemoteSnippet> {
        let response = self
            .client
            .get(format!("{}/videos", self.data_api_base_url))
            .bearer_auth(access_token)
            .query(&[("id", video_id), ("part", "snippet")])
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(status_error(response.status().as_u16(), "get snippet"));
        }

        #[derive(serde::Deserialize)]
        struct Snippet {
            title: String,
            description: String,
        }
        #[derive(serde::Deserialize)]
        struct Item {
            snippet: Snippet,
        }
        #[derive(serde::Deserialize)]
        struct Page {
            items: Vec<Item>,
        }
        let page: Page = response
            .json()
            .await
            .map_err(|e| ConnectorError::PermanentRemote(format!("malformed videos.list response: {e}")))?;

        let item = page
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ConnectorError::RemoteMissing(video_id.to_string()))?;
        Ok(RemoteSnippet {
            title: item.snippet.title,
            description: item.snippet.description,
        })
    }

    async fn patch_snippet(
        &self,
        access_token: &str,
        video_id: &str,
        title: &str,
        description: &str,
        tags: &[String],
    ) -> ConnectorResult<()> {
        let body = json!({
            "id": video_id,
            "snippet": {
                "title": title,
                "description": description,
                "tags": tags,
                "categoryId": "22",
            },
        });
        let response = self
            .client
            .put(format!("{}/videos", self.data_api_base_url))
            .bearer_auth(access_token)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(status_error(response.status().as_u16(), "patch snippet"));
        }
        Ok(())
    }

    async fn set_private(&self, access_token: &str, video_id: &str) -> ConnectorResult<()> {
        let body = json!({
            "id": video_id,
            "status": { "privacyStatus": "private" },
        });
        let response = self
            .client
            .put(format!("{}/videos", self.data_api_base_url))
            .bearer_auth(access_token)
            .query(&[("part", "status")])
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(status_error(response.status().as_u16(), "set privacy"));
        }
        Ok(())
    }

    async fn create_partner_asset(
        &self,
        access_token: &str,
        content_owner_id: &str,
        title: &str,
        description: &str,
    ) -> ConnectorResult<String> {
        let body = json!({
            "type": "web",
            "metadata": { "title": title, "description": description },
        });
        let response = self
            .client
            .post(format!("{}/assets", self.partner_api_base_url))
            .bearer_auth(access_token)
            .query(&[("onBehalfOfContentOwner", content_owner_id)])
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(status_error(response.status().as_u16(), "create partner asset"));
        }

        #[derive(serde::Deserialize)]
        struct Raw {
            id: String,
        }
        let raw: Raw = response
            .json()
            .await
            .map_err(|e| ConnectorError::PermanentRemote(format!("malformed asset response: {e}")))?;
        Ok(raw.id)
    }

    async fn set_ownership(
        &self,
        access_token: &str,
        asset_id: &str,
        content_owner_id: &str,
    ) -> ConnectorResult<()> {
        let body = json!({
            "general": [{
                "ratio": 100,
                "owner": content_owner_id,
                "territories": ["WORLD"],
            }],
        });
        let response = self
            .client
            .put(format!("{}/ownership/{asset_id}", self.partner_api_base_url))
            .bearer_auth(access_token)
            .query(&[("onBehalfOfContentOwner", content_owner_id)])
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(status_error(response.status().as_u16(), "set ownership"));
        }
        Ok(())
    }

    async fn insert_claim(&self, access_token: &str, asset_id: &str, video_id: &str) -> ConnectorResult<()> {
        let body = json!({
            "assetId": asset_id,
            "videoId": video_id,
            "policy": { "id": "default_monetize" },
            "contentType": "audiovisual",
        });
        let response = self
            .client
            .post(format!("{}/claims", self.partner_api_base_url))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(status_error(response.status().as_u16(), "insert claim"));
        }
        Ok(())
    }
}
