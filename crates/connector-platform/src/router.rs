//! Platform router: dispatches to the adapter registered for a registry
//! entry's `target_platform`. Thread-safe and async-compatible via tokio's
//! RwLock, though in practice the table is populated once at startup.

use crate::platform::{PlatformAdapter, UpdateOutcome, UploadOutcome};
use connector_core::{ConnectorError, ConnectorResult, MappingRecord, RegistryEntry, TargetPlatform};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct PlatformRouter {
    adapters: Arc<RwLock<HashMap<TargetPlatform, Arc<dyn PlatformAdapter>>>>,
}

impl PlatformRouter {
    pub fn new() -> Self {
        Self {
            adapters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters
            .write()
            .await
            .insert(adapter.platform(), adapter);
    }

    async fn adapter_for(&self, platform: TargetPlatform) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.read().await.get(&platform).cloned()
    }

    pub async fn upload(
        &self,
        video: &connector_core::VideoDescriptor,
        mapping: &MappingRecord,
        registry: &RegistryEntry,
    ) -> ConnectorResult<UploadOutcome> {
        self.adapter_for(registry.target_platform)
            .await
            .ok_or(ConnectorError::UnknownDestination {
                platform: registry.target_platform,
                operation: "upload",
            })?
            .upload(video, mapping, registry)
            .await
    }

    pub async fn update(
        &self,
        video: &connector_core::VideoDescriptor,
        mapping: &MappingRecord,
        registry: &RegistryEntry,
    ) -> ConnectorResult<UpdateOutcome> {
        self.adapter_for(registry.target_platform)
            .await
            .ok_or(ConnectorError::UnknownDestination {
                platform: registry.target_platform,
                operation: "update",
            })?
            .update(video, mapping, registry)
            .await
    }

    pub async fn unpublish(
        &self,
        mapping: &MappingRecord,
        registry: &RegistryEntry,
    ) -> ConnectorResult<()> {
        self.adapter_for(registry.target_platform)
            .await
            .ok_or(ConnectorError::UnknownDestination {
                platform: registry.target_platform,
                operation: "unpublish",
            })?
            .unpublish(mapping, registry)
            .await
    }

    pub async fn delete(
        &self,
        mapping: &MappingRecord,
        registry: &RegistryEntry,
    ) -> ConnectorResult<()> {
        self.adapter_for(registry.target_platform)
            .await
            .ok_or(ConnectorError::UnknownDestination {
                platform: registry.target_platform,
                operation: "delete",
            })?
            .delete(mapping, registry)
            .await
    }
}

impl Default for PlatformRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformAdapter;
    use async_trait::async_trait;
    use connector_core::{RegistryStatus, VideoDescriptor};

    #[derive(Debug)]
    struct NoopAdapter(TargetPlatform);

    #[async_trait]
    impl PlatformAdapter for NoopAdapter {
        fn platform(&self) -> TargetPlatform {
            self.0
        }

        async fn upload(
            &self,
            _video: &VideoDescriptor,
            _mapping: &MappingRecord,
            _registry: &RegistryEntry,
        ) -> ConnectorResult<UploadOutcome> {
            Ok(UploadOutcome {
                target_platform_video_id: "remote-1".into(),
                warning: None,
            })
        }

        async fn update(
            &self,
            _video: &VideoDescriptor,
            _mapping: &MappingRecord,
            _registry: &RegistryEntry,
        ) -> ConnectorResult<UpdateOutcome> {
            Ok(UpdateOutcome::Updated)
        }

        async fn unpublish(
            &self,
            _mapping: &MappingRecord,
            _registry: &RegistryEntry,
        ) -> ConnectorResult<()> {
            Ok(())
        }
    }

    fn test_entry() -> RegistryEntry {
        let mut entry =
            RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        entry.status = RegistryStatus::Notified;
        entry
    }

    fn test_mapping() -> MappingRecord {
        MappingRecord {
            mapping_id: "m1".into(),
            target_id: "token".into(),
            target_platform: TargetPlatform::Facebook,
            category_id: "c1".into(),
        }
    }

    #[tokio::test]
    async fn missing_adapter_returns_unknown_destination() {
        let router = PlatformRouter::new();
        let descriptor = VideoDescriptor::build("v1", connector_core::AssetRecord {
            title: None,
            description: None,
            tags: None,
            flavour_source_url: None,
            download_url: None,
            image_id: None,
            captions_url: None,
        });
        let err = router
            .upload(&descriptor, &test_mapping(), &test_entry())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::UnknownDestination { .. }));
    }

    #[tokio::test]
    async fn registered_adapter_handles_dispatch() {
        let router = PlatformRouter::new();
        router
            .register(Arc::new(NoopAdapter(TargetPlatform::Facebook)))
            .await;
        let mapping = test_mapping();
        let entry = test_entry();
        let outcome = router.unpublish(&mapping, &entry).await;
        assert!(outcome.is_ok());
    }
}
