//! YouTube MCN adapter: uploads on behalf of a content owner/channel
//! (partner API), then claims the video against a partner asset. A claim
//! failure does not roll back the upload — it surfaces as a warning on an
//! otherwise-successful run.

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

pub struct YoutubeMcnAdapter {
    client: Arc<dyn YoutubeClient>,
    credentials: Arc<dyn CredentialSource>,
    local_sink: LocalFileSink,
}

impl YoutubeMcnAdapter {
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

impl std::fmt::Debug for YoutubeMcnAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeMcnAdapter").finish_non_exhaustive()
    }
}

#[async_trait]
impl PlatformAdapter for YoutubeMcnAdapter {
    fn platform(&self) -> TargetPlatform {
        TargetPlatform::Youtube
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
        let content_owner_id = self.client.content_owner_id(&access_token).await?;

        let video_id = youtube_common::resumable_upload(
            self.client.as_ref(),
            &access_token,
            video,
            &self.local_sink,
            Some(content_owner_id.as_str()),
            Some(mapping.target_id.as_str()),
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

        match claim(self.client.as_ref(), &access_token, &content_owner_id, video, &video_id).await {
            Ok(()) => {}
            Err(e) => {
                warning = Some(match warning {
                    Some(existing) => format!("{existing}; claim failed: {}", e.flatten_causes()),
                    None => format!("claim failed: {}", e.flatten_causes()),
                });
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

async fn claim(
    client: &dyn YoutubeClient,
    access_token: &str,
    content_owner_id: &str,
    video: &VideoDescriptor,
    video_id: &str,
) -> ConnectorResult<()> {
    let asset_id = client
        .create_partner_asset(access_token, content_owner_id, &video.title, &video.description)
        .await?;
    client
        .set_ownership(access_token, &asset_id, content_owner_id)
        .await?;
    client.insert_claim(access_token, &asset_id, video_id).await
}
