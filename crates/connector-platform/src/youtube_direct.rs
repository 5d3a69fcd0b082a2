//! YouTube Direct adapter: same resumable upload and tamper-guarded update
//! as MCN, authenticated via a per-mapping OAuth refresh token, with no
//! content-owner indirection and no claim step.

use crate::credentials::CredentialSource;
use crate::platform::{PlatformAdapter, UpdateOutcome, UploadOutcome};
use crate::youtube_common::{self, YoutubeClient};
use async_trait::async_trait;
use connector_core::{
    ConnectorError, ConnectorResult, IntermediateState, MappingRecord, RegistryEntry,
    RegistryStatus, TargetPlatform, VideoDescriptor,
};
use connector_storage::LocalFileSink;
use std::sync::Arc;

pub struct YoutubeDirectAdapter {
    client: Arc<dyn YoutubeClient>,
    credentials: Arc<dyn CredentialSource>,
    local_sink: LocalFileSink,
}

impl YoutubeDirectAdapter {
    pub fn new(
        client: Arc<dyn YoutubeClient>,
        credentials: Arc<dyn CredentialSource>,
        local_sink: LocalFileSink,
    ) -> Self {
        Self {
            client,
            credentials,
            local_sink,
        }
    }
}

impl std::fmt::Debug for YoutubeDirectAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeDirectAdapter").finish_non_exhaustive()
    }
}

#[async_trait]
impl PlatformAdapter for YoutubeDirectAdapter {
    fn platform(&self) -> TargetPlatform {
        TargetPlatform::YoutubeDirect
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

        let video_id = youtube_common::resumable_upload(
            self.client.as_ref(),
            &access_token,
            video,
            &self.local_sink,
            None,
            None,
        )
        .await?;

        let mut warning = None;
        if let Some(image_filename) = &video.image_filename {
            match tokio::fs::read(self.local_sink.path_for(image_filename)).await {
                Ok(bytes) => {
                    if let Err(e) = self
                        .client
                        .upload_thumbnail(&access_token, &video_id, bytes.into())
                        .await
                    {
                        warning = Some(format!("thumbnail upload failed: {}", e.flatten_causes()));
                    }
                }
                Err(e) => warning = Some(format!("thumbnail file unreadable: {e}")),
            }
        }

        Ok(UploadOutcome {
            target_platform_video_id: video_id,
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
        let applied =
            youtube_common::tamper_guarded_update(self.client.as_ref(), &access_token, video, registry)
                .await?;
        Ok(if applied {
            UpdateOutcome::Updated
        } else {
            UpdateOutcome::SkippedTamperDetected
        })
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
        self.client
            .set_private(&access_token, &registry.target_platform_video_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::test_support::StaticCredentialSource;
    use crate::youtube_mcn::test_support::MockYoutubeClient;
    use connector_core::AssetRecord;

    fn mapping() -> MappingRecord {
        MappingRecord {
            mapping_id: "m1".into(),
            target_id: "refresh-token-1".into(),
            target_platform: TargetPlatform::YoutubeDirect,
            category_id: "c1".into(),
        }
    }

    #[tokio::test]
    async fn upload_succeeds_without_a_claim_step() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalFileSink::new(dir.path());
        sink.write("v1-test.mpeg", &bytes::Bytes::from_static(b"bytes"))
            .await
            .unwrap();
        let adapter = YoutubeDirectAdapter::new(
            Arc::new(MockYoutubeClient::default()),
            Arc::new(StaticCredentialSource("token".into())),
            sink,
        );

        let mut video = VideoDescriptor::build(
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
        );
        video.filename = "v1-test.mpeg".into();
        let mut entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::YoutubeDirect);
        entry.intermediate_state = IntermediateState::Uploading;

        let outcome = adapter.upload(&video, &mapping(), &entry).await.unwrap();
        assert_eq!(outcome.target_platform_video_id, "yt-video-1");
        assert!(outcome.warning.is_none());
    }
}
