//! Shared machinery between the YouTube MCN and YouTube Direct adapters:
//! the resumable upload loop, metadata tamper guard, and privacy-status
//! based unpublish. The two adapters differ only in how they acquire
//! credentials and in the MCN claim step.

use crate::backoff::{is_youtube_retryable_status, youtube_backoff, YOUTUBE_MAX_RETRIES};
use async_trait::async_trait;
use bytes::Bytes;
use connector_core::{
    hash_title_and_description, ConnectorError, ConnectorResult, RegistryEntry, VideoDescriptor,
};
use connector_storage::LocalFileSink;

/// YouTube accepts resumable uploads in chunks up to this size.
pub const CHUNK_SIZE_BYTES: u64 = 512 * 1024 * 1024;

pub enum ChunkOutcome {
    Complete { video_id: String },
    Incomplete { next_offset: u64 },
}

#[derive(Debug, Clone)]
pub struct RemoteSnippet {
    pub title: String,
    pub description: String,
}

/// Narrow seam onto the YouTube Data + Partner APIs.
#[async_trait]
pub trait YoutubeClient: Send + Sync {
    async fn content_owner_id(&self, access_token: &str) -> ConnectorResult<String>;

    async fn start_resumable_upload(
        &self,
        access_token: &str,
        video: &VideoDescriptor,
        on_behalf_of_content_owner: Option<&str>,
        on_behalf_of_content_owner_channel: Option<&str>,
    ) -> ConnectorResult<String>;

    /// Returns `Err(ConnectorError::TransientRemote)` for a retryable HTTP
    /// status (500/502/503/504) so the resumable loop can back off and
    /// retry the same chunk; any other error is treated as permanent.
    async fn upload_chunk(
        &self,
        upload_url: &str,
        offset: u64,
        chunk: Bytes,
        total_size: u64,
    ) -> ConnectorResult<ChunkOutcome>;

    async fn upload_thumbnail(&self, access_token: &str, video_id: &str, bytes: Bytes) -> ConnectorResult<()>;

    async fn get_snippet(&self, access_token: &str, video_id: &str) -> ConnectorResult<RemoteSnippet>;

    async fn patch_snippet(
        &self,
        access_token: &str,
        video_id: &str,
        title: &str,
        description: &str,
        tags: &[String],
    ) -> ConnectorResult<()>;

    async fn set_private(&self, access_token: &str, video_id: &str) -> ConnectorResult<()>;

    async fn create_partner_asset(
        &self,
        access_token: &str,
        content_owner_id: &str,
        title: &str,
        description: &str,
    ) -> ConnectorResult<String>;

    async fn set_ownership(
        &self,
        access_token: &str,
        asset_id: &str,
        content_owner_id: &str,
    ) -> ConnectorResult<()>;

    async fn insert_claim(&self, access_token: &str, asset_id: &str, video_id: &str) -> ConnectorResult<()>;
}

/// Uploads `video`'s source file in 512 MiB chunks, retrying transient
/// per-chunk failures with jittered exponential backoff up to 10 attempts.
/// Returns the resulting video id.
pub async fn resumable_upload(
    client: &dyn YoutubeClient,
    access_token: &str,
    video: &VideoDescriptor,
    local_sink: &LocalFileSink,
    on_behalf_of_content_owner: Option<&str>,
    on_behalf_of_content_owner_channel: Option<&str>,
) -> ConnectorResult<String> {
    let path = local_sink.path_for(&video.filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ConnectorError::UploadFailed(format!("cannot read {path:?}: {e}")))?;
    let total_size = bytes.len() as u64;

    let upload_url = client
        .start_resumable_upload(
            access_token,
            video,
            on_behalf_of_content_owner,
            on_behalf_of_content_owner_channel,
        )
        .await?;

    let mut offset = 0u64;
    loop {
        let end = ((offset + CHUNK_SIZE_BYTES).min(total_size)) as usize;
        let chunk = Bytes::copy_from_slice(&bytes[offset as usize..end]);

        let mut retry = 0;
        loop {
            match client
                .upload_chunk(&upload_url, offset, chunk.clone(), total_size)
                .await
            {
                Ok(ChunkOutcome::Complete { video_id }) => return Ok(video_id),
                Ok(ChunkOutcome::Incomplete { next_offset }) => {
                    offset = next_offset;
                    break;
                }
                Err(e) if e.is_retryable() && retry < YOUTUBE_MAX_RETRIES => {
                    retry += 1;
                    tracing::warn!(retry, error = %e, "youtube chunk upload failed, retrying");
                    tokio::time::sleep(youtube_backoff(retry)).await;
                }
                Err(e) => return Err(ConnectorError::UploadFailed(e.flatten_causes())),
            }
        }
    }
}

pub fn status_error(status: u16, context: &str) -> ConnectorError {
    if is_youtube_retryable_status(status) {
        ConnectorError::TransientRemote(format!("{context} returned {status}"))
    } else {
        ConnectorError::PermanentRemote(format!("{context} returned {status}"))
    }
}

/// Fetches the remote snippet, compares its hash to the registry's last
/// known hash, and patches title/description/tags only when unchanged.
pub async fn tamper_guarded_update(
    client: &dyn YoutubeClient,
    access_token: &str,
    video: &VideoDescriptor,
    registry: &RegistryEntry,
) -> ConnectorResult<bool> {
    let remote = client
        .get_snippet(access_token, &registry.target_platform_video_id)
        .await?;
    let remote_hash = hash_title_and_description(&remote.title, &remote.description);
    if remote_hash != registry.video_hash_code {
        tracing::warn!(
            registry_id = %registry.registry_id,
            "remote snippet hash mismatch, skipping update"
        );
        return Ok(false);
    }

    client
        .patch_snippet(
            access_token,
            &registry.target_platform_video_id,
            &video.title,
            &video.description,
            &video.keywords,
        )
        .await?;
    Ok(true)
}
