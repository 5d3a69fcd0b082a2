//! Platform adapter contract: one implementation per remote destination
//! (Facebook, YouTube MCN, YouTube Direct). Adapters own retry/backoff for
//! their own transient failures; the engine never retries on their behalf.

use async_trait::async_trait;
use connector_core::{ConnectorResult, MappingRecord, RegistryEntry, TargetPlatform, VideoDescriptor};
use std::fmt::Debug;

/// Successful upload result. `warning` is set when the upload itself landed
/// but a secondary step (captions, claim, thumbnail) failed — the run still
/// advances to `active`, but the warning is preserved in the registry.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub target_platform_video_id: String,
    pub warning: Option<String>,
}

/// Result of a metadata update attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    SkippedTamperDetected,
}

#[async_trait]
pub trait PlatformAdapter: Send + Sync + Debug {
    fn platform(&self) -> TargetPlatform;

    async fn upload(
        &self,
        video: &VideoDescriptor,
        mapping: &MappingRecord,
        registry: &RegistryEntry,
    ) -> ConnectorResult<UploadOutcome>;

    async fn update(
        &self,
        video: &VideoDescriptor,
        mapping: &MappingRecord,
        registry: &RegistryEntry,
    ) -> ConnectorResult<UpdateOutcome>;

    async fn unpublish(
        &self,
        mapping: &MappingRecord,
        registry: &RegistryEntry,
    ) -> ConnectorResult<()>;

    /// This system never actually deletes remote content; delete is an
    /// alias for unpublish unless an adapter overrides it.
    async fn delete(&self, mapping: &MappingRecord, registry: &RegistryEntry) -> ConnectorResult<()> {
        self.unpublish(mapping, registry).await
    }
}
