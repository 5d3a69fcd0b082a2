//! Facebook adapter: chunked/resumable video upload via the Graph API's
//! start/transfer/finish upload-session protocol, tamper-guarded metadata
//! updates, and unpublish-as-expire.

use crate::backoff::{FACEBOOK_CHUNK_TIMEOUT, FACEBOOK_MAX_RETRIES, FACEBOOK_RETRY_SLEEP};
use crate::credentials::CredentialSource;
use crate::platform::{PlatformAdapter, UpdateOutcome, UploadOutcome};
use async_trait::async_trait;
use bytes::Bytes;
use connector_core::{
    hash_title_and_description, ConnectorError, ConnectorResult, IntermediateState,
    MappingRecord, RegistryEntry, RegistryStatus, TargetPlatform, VideoDescriptor,
};
use connector_storage::LocalFileSink;
use std::sync::Arc;

/// Roughly 150 days from now, expressed in whole seconds — Facebook wants a
/// Unix timestamp for the scheduled publish time of an unpublished upload.
const SCHEDULED_PUBLISH_OFFSET_SECS: i64 = 150 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct StartUploadResponse {
    pub upload_session_id: String,
    pub video_id: String,
    pub start_offset: u64,
    pub end_offset: u64,
}

#[derive(Debug, Clone)]
pub struct TransferResponse {
    pub start_offset: u64,
    pub end_offset: u64,
}

#[derive(Debug, Clone)]
pub struct RemoteMetadata {
    pub title: String,
    pub description: String,
}

/// Narrow seam onto the Facebook Graph API, mocked in tests so the upload
/// state machine can be exercised without a network call.
#[async_trait]
pub trait FacebookGraphClient: Send + Sync {
    async fn start_upload(
        &self,
        access_token: &str,
        page_id: &str,
        file_size: u64,
    ) -> ConnectorResult<StartUploadResponse>;

    async fn transfer_chunk(
        &self,
        access_token: &str,
        upload_session_id: &str,
        start_offset: u64,
        chunk: Bytes,
    ) -> ConnectorResult<TransferResponse>;

    async fn finish_upload(
        &self,
        access_token: &str,
        upload_session_id: &str,
        title: &str,
        description: &str,
        scheduled_publish_time: i64,
        thumbnail: Option<Bytes>,
    ) -> ConnectorResult<()>;

    async fn upload_captions(
        &self,
        access_token: &str,
        video_id: &str,
        captions: Bytes,
    ) -> ConnectorResult<()>;

    async fn get_metadata(
        &self,
        access_token: &str,
        video_id: &str,
    ) -> ConnectorResult<RemoteMetadata>;

    async fn patch_metadata(
        &self,
        access_token: &str,
        video_id: &str,
        title: &str,
        description: &str,
    ) -> ConnectorResult<()>;

    async fn expire_now(&self, access_token: &str, video_id: &str) -> ConnectorResult<()>;
}

pub struct LiveFacebookGraphClient {
    client: reqwest::Client,
    graph_base_url: String,
}

impl LiveFacebookGraphClient {
    pub fn new(client: reqwest::Client, graph_base_url: impl Into<String>) -> Self {
        Self {
            client,
            graph_base_url: graph_base_url.into(),
        }
    }
}

#[async_trait]
impl FacebookGraphClient for LiveFacebookGraphClient {
    async fn start_upload(
        &self,
        access_token: &str,
        page_id: &str,
        file_size: u64,
    ) -> ConnectorResult<StartUploadResponse> {
        let url = format!("{}/{page_id}/videos", self.graph_base_url);
        let response = self
            .client
            .post(&url)
            .query(&[
                ("upload_phase", "start"),
                ("access_token", access_token),
                ("file_size", &file_size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;

        #[derive(serde::Deserialize)]
        struct Raw {
            upload_session_id: String,
            video_id: String,
            start_offset: String,
            end_offset: String,
        }
        let raw: Raw = response
            .json()
            .await
            .map_err(|e| ConnectorError::PermanentRemote(format!("malformed start response: {e}")))?;

        Ok(StartUploadResponse {
            upload_session_id: raw.upload_session_id,
            video_id: raw.video_id,
            start_offset: raw.start_offset.parse().unwrap_or(0),
            end_offset: raw.end_offset.parse().unwrap_or(0),
        })
    }

    async fn transfer_chunk(
        &self,
        access_token: &str,
        upload_session_id: &str,
        start_offset: u64,
        chunk: Bytes,
    ) -> ConnectorResult<TransferResponse> {
        let response = tokio::time::timeout(FACEBOOK_CHUNK_TIMEOUT, async {
            self.client
                .post(format!("{}/video_chunk", self.graph_base_url))
                .query(&[
                    ("upload_phase", "transfer"),
                    ("access_token", access_token),
                    ("upload_session_id", upload_session_id),
                    ("start_offset", &start_offset.to_string()),
                ])
                .body(chunk)
                .send()
                .await
        })
        .await
        .map_err(|_| ConnectorError::TransientRemote("chunk transfer timed out".into()))?
        .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;

        #[derive(serde::Deserialize)]
        struct Raw {
            start_offset: String,
            end_offset: String,
        }
        let raw: Raw = response
            .json()
            .await
            .map_err(|e| ConnectorError::TransientRemote(format!("malformed chunk response: {e}")))?;

        Ok(TransferResponse {
            start_offset: raw.start_offset.parse().unwrap_or(0),
            end_offset: raw.end_offset.parse().unwrap_or(0),
        })
    }

    async fn finish_upload(
        &self,
        access_token: &str,
        upload_session_id: &str,
        title: &str,
        description: &str,
        scheduled_publish_time: i64,
        thumbnail: Option<Bytes>,
    ) -> ConnectorResult<()> {
        let request = self
            .client
            .post(format!("{}/video_chunk", self.graph_base_url))
            .query(&[
                ("upload_phase", "finish"),
                ("access_token", access_token),
                ("upload_session_id", upload_session_id),
                ("title", title),
                ("description", description),
                ("published", "false"),
                ("scheduled_publish_time", &scheduled_publish_time.to_string()),
            ]);

        let request = match thumbnail {
            Some(bytes) => {
                let part = reqwest::multipart::Part::bytes(bytes.to_vec())
                    .file_name("thumbnail.jpg")
                    .mime_str("image/jpeg")
                    .map_err(|e| ConnectorError::UploadFailed(format!("thumbnail part: {e}")))?;
                request.multipart(reqwest::multipart::Form::new().part("thumb", part))
            }
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConnectorError::UploadFailed(format!(
                "finish phase failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn upload_captions(
        &self,
        access_token: &str,
        video_id: &str,
        captions: Bytes,
    ) -> ConnectorResult<()> {
        let response = self
            .client
            .post(format!("{}/{video_id}/captions", self.graph_base_url))
            .query(&[("access_token", access_token)])
            .body(captions)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ConnectorError::PermanentRemote(format!(
                "captions upload failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn get_metadata(
        &self,
        access_token: &str,
        video_id: &str,
    ) -> ConnectorResult<RemoteMetadata> {
        let response = self
            .client
            .get(format!("{}/{video_id}", self.graph_base_url))
            .query(&[("access_token", access_token), ("fields", "title,description")])
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ConnectorError::RemoteMissing(video_id.to_string()));
        }

        response
            .json()
            .await
            .map_err(|e| ConnectorError::PermanentRemote(format!("malformed metadata response: {e}")))
    }

    async fn patch_metadata(
        &self,
        access_token: &str,
        video_id: &str,
        title: &str,
        description: &str,
    ) -> ConnectorResult<()> {
        let response = self
            .client
            .post(format!("{}/{video_id}", self.graph_base_url))
            .query(&[
                ("access_token", access_token),
                ("title", title),
                ("description", description),
            ])
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ConnectorError::PermanentRemote(format!(
                "metadata patch failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn expire_now(&self, access_token: &str, video_id: &str) -> ConnectorResult<()> {
        let response = self
            .client
            .post(format!("{}/{video_id}", self.graph_base_url))
            .query(&[("access_token", access_token), ("expire_now", "true")])
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ConnectorError::PermanentRemote(format!(
                "expire_now failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

pub struct FacebookAdapter {
    graph: Arc<dyn FacebookGraphClient>,
    credentials: Arc<dyn CredentialSource>,
    local_sink: LocalFileSink,
    /// Max bytes read per `transfer` call.
    chunk_size: u64,
    now_unix: fn() -> i64,
}

impl FacebookAdapter {
    pub fn new(
        graph: Arc<dyn FacebookGraphClient>,
        credentials: Arc<dyn CredentialSource>,
        local_sink: LocalFileSink,
    ) -> Self {
        Self {
            graph,
            credentials,
            local_sink,
            chunk_size: 4 * 1024 * 1024,
            now_unix: default_now_unix,
        }
    }
}

fn default_now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl PlatformAdapter for FacebookAdapter {
    fn platform(&self) -> TargetPlatform {
        TargetPlatform::Facebook
    }

    async fn upload(
        &self,
        video: &VideoDescriptor,
        mapping: &MappingRecord,
        registry: &RegistryEntry,
    ) -> ConnectorResult<UploadOutcome> {
        if !registry.target_platform_video_id.is_empty() {
            return Err(ConnectorError::precondition(
                &registry.registry_id,
                "upload",
                "target_platform_video_id already set",
            ));
        }
        if registry.intermediate_state != IntermediateState::Uploading {
            return Err(ConnectorError::precondition(
                &registry.registry_id,
                "upload",
                "intermediate_state must be uploading",
            ));
        }

        let access_token = self.credentials.access_token(mapping).await?;
        let path = self.local_sink.path_for(&video.filename);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ConnectorError::UploadFailed(format!("cannot read {path:?}: {e}")))?;
        let file_size = bytes.len() as u64;

        let start = self
            .graph
            .start_upload(&access_token, &mapping.target_id, file_size)
            .await?;

        let mut start_offset = start.start_offset;
        let mut end_offset = start.end_offset;
        let session_id = start.upload_session_id;

        while end_offset > start_offset {
            let end = ((start_offset + self.chunk_size).min(end_offset)) as usize;
            let chunk = Bytes::copy_from_slice(&bytes[start_offset as usize..end]);

            let mut attempt = 0;
            loop {
                match self
                    .graph
                    .transfer_chunk(&access_token, &session_id, start_offset, chunk.clone())
                    .await
                {
                    Ok(resp) => {
                        start_offset = resp.start_offset;
                        end_offset = resp.end_offset;
                        break;
                    }
                    Err(e) if e.is_retryable() && attempt < FACEBOOK_MAX_RETRIES => {
                        attempt += 1;
                        tracing::warn!(
                            registry_id = %registry.registry_id,
                            attempt,
                            error = %e,
                            "facebook chunk transfer failed, retrying"
                        );
                        tokio::time::sleep(FACEBOOK_RETRY_SLEEP).await;
                    }
                    Err(e) => return Err(ConnectorError::UploadFailed(e.flatten_causes())),
                }
            }
        }

        let thumbnail = match &video.image_filename {
            Some(filename) => tokio::fs::read(self.local_sink.path_for(filename))
                .await
                .ok()
                .map(Bytes::from),
            None => None,
        };

        self.graph
            .finish_upload(
                &access_token,
                &session_id,
                &video.title,
                &video.description,
                (self.now_unix)() + SCHEDULED_PUBLISH_OFFSET_SECS,
                thumbnail,
            )
            .await?;

        let mut warning = None;
        if let Some(captions_filename) = &video.captions_filename {
            match tokio::fs::read(self.local_sink.path_for(captions_filename)).await {
                Ok(bytes) => {
                    if let Err(e) = self
                        .graph
                        .upload_captions(&access_token, &start.video_id, Bytes::from(bytes))
                        .await
                    {
                        warning = Some(format!("captions upload failed: {}", e.flatten_causes()));
                    }
                }
                Err(e) => {
                    warning = Some(format!("captions file unreadable: {e}"));
                }
            }
        }

        Ok(UploadOutcome {
            target_platform_video_id: start.video_id,
            warning,
        })
    }

    async fn update(
        &self,
        video: &VideoDescriptor,
        mapping: &MappingRecord,
        registry: &RegistryEntry,
    ) -> ConnectorResult<UpdateOutcome> {
        if registry.target_platform_video_id.is_empty() {
            return Err(ConnectorError::precondition(
                &registry.registry_id,
                "update",
                "target_platform_video_id must be set",
            ));
        }
        if registry.intermediate_state != IntermediateState::Updating {
            return Err(ConnectorError::precondition(
                &registry.registry_id,
                "update",
                "intermediate_state must be updating",
            ));
        }

        let access_token = self.credentials.access_token(mapping).await?;
        let remote = self
            .graph
            .get_metadata(&access_token, &registry.target_platform_video_id)
            .await?;
        let remote_hash = hash_title_and_description(&remote.title, &remote.description);
        if remote_hash != registry.video_hash_code {
            tracing::warn!(
                registry_id = %registry.registry_id,
                "remote metadata hash mismatch, skipping update to avoid clobbering manual edits"
            );
            return Ok(UpdateOutcome::SkippedTamperDetected);
        }

        self.graph
            .patch_metadata(
                &access_token,
                &registry.target_platform_video_id,
                &video.title,
                &video.description,
            )
            .await?;
        Ok(UpdateOutcome::Updated)
    }

    async fn unpublish(
        &self,
        mapping: &MappingRecord,
        registry: &RegistryEntry,
    ) -> ConnectorResult<()> {
        if registry.target_platform_video_id.is_empty() {
            return Err(ConnectorError::precondition(
                &registry.registry_id,
                "unpublish",
                "target_platform_video_id must be set",
            ));
        }
        if !matches!(
            registry.status,
            RegistryStatus::Active | RegistryStatus::Error
        ) {
            return Err(ConnectorError::precondition(
                &registry.registry_id,
                "unpublish",
                "status must be active or error",
            ));
        }

        let access_token = self.credentials.access_token(mapping).await?;
        self.graph
            .expire_now(&access_token, &registry.target_platform_video_id)
            .await
    }
}

impl std::fmt::Debug for FacebookAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacebookAdapter").finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MockFacebookGraphClient;
    use super::*;
    use crate::credentials::test_support::StaticCredentialSource;
    use connector_core::AssetRecord;
    use tokio::sync::Mutex;

    fn mapping() -> MappingRecord {
        MappingRecord {
            mapping_id: "m1".into(),
            target_id: "page-1".into(),
            target_platform: TargetPlatform::Facebook,
            category_id: "c1".into(),
        }
    }

    fn descriptor() -> VideoDescriptor {
        VideoDescriptor::build(
            "v1",
            AssetRecord {
                title: Some("T".into()),
                description: Some("D".into()),
                tags: None,
                flavour_source_url: Some("https://cdn/a.mp4".into()),
                download_url: None,
                image_id: None,
                captions_url: None,
            },
        )
    }

    async fn adapter_with(graph: Arc<dyn FacebookGraphClient>) -> (FacebookAdapter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalFileSink::new(dir.path());
        let adapter = FacebookAdapter::new(
            graph,
            Arc::new(StaticCredentialSource("token".into())),
            sink,
        );
        (adapter, dir)
    }

    #[tokio::test]
    async fn upload_rejects_nonempty_remote_id() {
        let (adapter, _dir) = adapter_with(Arc::new(MockFacebookGraphClient::default())).await;
        let mut entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        entry.target_platform_video_id = "already-set".into();
        entry.intermediate_state = IntermediateState::Uploading;
        let err = adapter
            .upload(&descriptor(), &mapping(), &entry)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn upload_succeeds_after_writing_source_file() {
        let (adapter, _dir) = adapter_with(Arc::new(MockFacebookGraphClient::default())).await;
        adapter
            .local_sink
            .write("v1-test.mpeg", &Bytes::from_static(b"video-bytes"))
            .await
            .unwrap();
        let mut video = descriptor();
        video.filename = "v1-test.mpeg".into();

        let mut entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        entry.intermediate_state = IntermediateState::Uploading;

        let outcome = adapter.upload(&video, &mapping(), &entry).await.unwrap();
        assert_eq!(outcome.target_platform_video_id, "remote-video-1");
        assert!(outcome.warning.is_none());
    }

    #[tokio::test]
    async fn upload_retries_transient_chunk_failures() {
        let graph = Arc::new(MockFacebookGraphClient {
            transfer_failures_before_success: Mutex::new(2),
            metadata: Mutex::new(None),
        });
        let (adapter, _dir) = adapter_with(graph).await;
        adapter
            .local_sink
            .write("v1-test.mpeg", &Bytes::from_static(b"video-bytes"))
            .await
            .unwrap();
        let mut video = descriptor();
        video.filename = "v1-test.mpeg".into();
        let mut entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        entry.intermediate_state = IntermediateState::Uploading;

        let outcome = adapter.upload(&video, &mapping(), &entry).await.unwrap();
        assert_eq!(outcome.target_platform_video_id, "remote-video-1");
    }

    #[tokio::test]
    async fn update_skips_on_tamper_detection() {
        let graph = Arc::new(MockFacebookGraphClient {
            transfer_failures_before_success: Mutex::new(0),
            metadata: Mutex::new(Some(RemoteMetadata {
                title: "edited elsewhere".into(),
                description: "by someone else".into(),
            })),
        });
        let (adapter, _dir) = adapter_with(graph).await;
        let mut entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        entry.target_platform_video_id = "remote-video-1".into();
        entry.intermediate_state = IntermediateState::Updating;
        entry.video_hash_code = hash_title_and_description("T", "D");

        let outcome = adapter
            .update(&descriptor(), &mapping(), &entry)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::SkippedTamperDetected);
    }

    #[tokio::test]
    async fn update_applies_when_hash_matches() {
        let graph = Arc::new(MockFacebookGraphClient {
            transfer_failures_before_success: Mutex::new(0),
            metadata: Mutex::new(Some(RemoteMetadata {
                title: "T".into(),
                description: "D".into(),
            })),
        });
        let (adapter, _dir) = adapter_with(graph).await;
        let mut entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        entry.target_platform_video_id = "remote-video-1".into();
        entry.intermediate_state = IntermediateState::Updating;
        entry.video_hash_code = hash_title_and_description("T", "D");

        let outcome = adapter
            .update(&descriptor(), &mapping(), &entry)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);
    }
}
