//! The publishing state machine: download, upload, update, unpublish, and
//! delete a registry entry against whichever platform adapter its mapping
//! resolves to.
//!
//! Every state persists `intermediate_state` before attempting its side
//! effect, so a crash mid-run leaves enough information for the error-resume
//! table in [`Engine::handle`] to pick the run back up. The engine never
//! retries on its own — adapters own retry/backoff for their own transient
//! failures (see `connector-platform`); a failure here is recorded on the
//! registry entry and waits for an external re-trigger.

use bytes::Bytes;
use connector_core::{
    ConnectorError, ConnectorResult, IntermediateState, RegistryEntry, RegistryStatus,
    VideoDescriptor,
};
use connector_db::{MappingStore, RegistryStore};
use connector_platform::PlatformRouter;
use connector_platform::UpdateOutcome;
use connector_storage::{AssetCatalog, LocalFileSink, ThumbnailStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The three operations an external trigger can request against a registry
/// entry. Each is keyed purely by `registry_id`; the event plus the entry's
/// current `status` (and, on resume, `intermediate_state`) determine what
/// actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryEvent {
    Update,
    Unpublish,
    Delete,
}

pub struct Engine {
    registry: Arc<dyn RegistryStore>,
    mappings: Arc<dyn MappingStore>,
    assets: Arc<dyn AssetCatalog>,
    thumbnails: Arc<dyn ThumbnailStore>,
    router: PlatformRouter,
    local_sink: LocalFileSink,
    http: reqwest::Client,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<dyn RegistryStore>,
        mappings: Arc<dyn MappingStore>,
        assets: Arc<dyn AssetCatalog>,
        thumbnails: Arc<dyn ThumbnailStore>,
        router: PlatformRouter,
        local_sink: LocalFileSink,
        http: reqwest::Client,
    ) -> Self {
        Self {
            registry,
            mappings,
            assets,
            thumbnails,
            router,
            local_sink,
            http,
        }
    }

    /// `update(registry_id)` — the only entry point that can start a fresh
    /// publish run (on a `notified` entry) or patch metadata on an already
    /// `active`/`inactive`/`error` one.
    pub async fn update(&self, registry_id: &str, cancel: CancellationToken) -> ConnectorResult<()> {
        self.handle(EntryEvent::Update, registry_id, cancel).await
    }

    pub async fn unpublish(
        &self,
        registry_id: &str,
        cancel: CancellationToken,
    ) -> ConnectorResult<()> {
        self.handle(EntryEvent::Unpublish, registry_id, cancel)
            .await
    }

    pub async fn delete(&self, registry_id: &str, cancel: CancellationToken) -> ConnectorResult<()> {
        self.handle(EntryEvent::Delete, registry_id, cancel).await
    }

    async fn handle(
        &self,
        event: EntryEvent,
        registry_id: &str,
        cancel: CancellationToken,
    ) -> ConnectorResult<()> {
        let entry = self.registry.load(registry_id).await?;

        match (event, entry.status) {
            (EntryEvent::Update, RegistryStatus::Notified) => {
                self.run_publish(entry, &cancel).await
            }
            (EntryEvent::Update, RegistryStatus::Active) => self.run_update(entry, &cancel).await,
            (EntryEvent::Update, RegistryStatus::Inactive) => self.run_reactivate(entry).await,
            (EntryEvent::Update, RegistryStatus::Error) => match entry.intermediate_state {
                IntermediateState::Updating => self.run_update(entry, &cancel).await,
                _ => self.run_publish(entry, &cancel).await,
            },
            (EntryEvent::Unpublish, RegistryStatus::Active)
            | (EntryEvent::Unpublish, RegistryStatus::Error) => {
                self.run_unpublish(entry, &cancel).await
            }
            (EntryEvent::Delete, _) => self.run_delete(entry, &cancel).await,
            _ => {
                tracing::debug!(
                    registry_id,
                    ?event,
                    status = ?entry.status,
                    "no action for this (event, status) pair"
                );
                Ok(())
            }
        }
    }

    async fn run_publish(
        &self,
        mut entry: RegistryEntry,
        cancel: &CancellationToken,
    ) -> ConnectorResult<()> {
        let mapping = self.mappings.get(&entry.mapping_id).await?;

        entry.intermediate_state = IntermediateState::Downloading;
        self.registry.save(&entry).await?;

        let asset = match cancellable(cancel, self.assets.fetch_video(&entry.video_id)).await {
            Ok(asset) => asset,
            Err(e) => return self.fail(&mut entry, e).await,
        };
        let video = VideoDescriptor::build(&entry.video_id, asset);

        if let Err(e) = self.stage_local_files(&video, cancel).await {
            return self.fail(&mut entry, e).await;
        }

        entry.intermediate_state = IntermediateState::Uploading;
        entry.video_hash_code = video.hash_code.clone();
        self.registry.save(&entry).await?;

        let outcome = match cancellable(
            cancel,
            self.router.upload(&video, &mapping, &entry),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(&mut entry, e).await,
        };

        entry.target_platform_video_id = outcome.target_platform_video_id;
        entry.status = RegistryStatus::Active;
        entry.intermediate_state = IntermediateState::None;
        // Success-with-warning: the adapter's message stands; don't overwrite it.
        if let Some(warning) = outcome.warning {
            entry.message = warning;
        }
        self.registry.save(&entry).await?;

        self.cleanup(&video, cancel).await
    }

    /// Downloads the source video (mandatory) and, best-effort, the
    /// thumbnail and captions side-channels. A side-channel failure is
    /// logged and the corresponding filename is left unset; only the source
    /// download failing aborts the run.
    async fn stage_local_files(
        &self,
        video: &VideoDescriptor,
        cancel: &CancellationToken,
    ) -> ConnectorResult<()> {
        let source = cancellable(cancel, self.download_bytes(&video.download_url)).await?;
        self.local_sink.write(&video.filename, &source).await?;

        if let (Some(image_id), Some(image_filename)) = (&video.image_id, &video.image_filename) {
            match cancellable(cancel, self.thumbnails.fetch(image_id)).await {
                Ok(bytes) => {
                    if let Err(e) = self.local_sink.write(image_filename, &bytes).await {
                        tracing::warn!(video_id = %video.video_id, error = %e, "thumbnail staging failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(video_id = %video.video_id, error = %e, "thumbnail fetch failed, continuing without it");
                }
            }
        }

        if let (Some(captions_url), Some(captions_filename)) =
            (&video.captions_url, &video.captions_filename)
        {
            match cancellable(cancel, self.download_bytes(captions_url)).await {
                Ok(bytes) => {
                    if let Err(e) = self.local_sink.write(captions_filename, &bytes).await {
                        tracing::warn!(video_id = %video.video_id, error = %e, "captions staging failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(video_id = %video.video_id, error = %e, "captions download failed, continuing without them");
                }
            }
        }

        Ok(())
    }

    async fn run_update(
        &self,
        mut entry: RegistryEntry,
        cancel: &CancellationToken,
    ) -> ConnectorResult<()> {
        let mapping = self.mappings.get(&entry.mapping_id).await?;

        let asset = match cancellable(cancel, self.assets.fetch_video(&entry.video_id)).await {
            Ok(asset) => asset,
            Err(e) => return self.fail(&mut entry, e).await,
        };
        let video = VideoDescriptor::build(&entry.video_id, asset);

        entry.intermediate_state = IntermediateState::Updating;
        self.registry.save(&entry).await?;

        let outcome = match cancellable(
            cancel,
            self.router.update(&video, &mapping, &entry),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(&mut entry, e).await,
        };

        entry.status = RegistryStatus::Active;
        entry.intermediate_state = IntermediateState::None;
        if outcome == UpdateOutcome::Updated {
            entry.video_hash_code = video.hash_code.clone();
        }
        self.registry.save(&entry).await
    }

    async fn run_reactivate(&self, mut entry: RegistryEntry) -> ConnectorResult<()> {
        entry.status = RegistryStatus::Active;
        entry.intermediate_state = IntermediateState::None;
        self.registry.save(&entry).await
    }

    async fn run_unpublish(
        &self,
        mut entry: RegistryEntry,
        cancel: &CancellationToken,
    ) -> ConnectorResult<()> {
        let mapping = self.mappings.get(&entry.mapping_id).await?;

        entry.intermediate_state = IntermediateState::Unpublishing;
        self.registry.save(&entry).await?;

        if let Err(e) = cancellable(cancel, self.router.unpublish(&mapping, &entry)).await {
            return self.fail(&mut entry, e).await;
        }

        entry.status = RegistryStatus::Inactive;
        entry.intermediate_state = IntermediateState::None;
        self.registry.save(&entry).await
    }

    async fn run_delete(
        &self,
        mut entry: RegistryEntry,
        cancel: &CancellationToken,
    ) -> ConnectorResult<()> {
        let mapping = self.mappings.get(&entry.mapping_id).await?;

        entry.intermediate_state = IntermediateState::Deleting;
        self.registry.save(&entry).await?;

        if !entry.target_platform_video_id.is_empty() {
            if let Err(e) = cancellable(cancel, self.router.delete(&mapping, &entry)).await {
                return self.fail(&mut entry, e).await;
            }
        }

        entry.status = RegistryStatus::Deleted;
        entry.intermediate_state = IntermediateState::None;
        self.registry.save(&entry).await
    }

    async fn download_bytes(&self, url: &str) -> ConnectorResult<Bytes> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ConnectorError::TransientRemote(format!(
                "source download returned {}",
                response.status()
            )));
        }
        response
            .bytes()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))
    }

    /// Persists `status = error` (keeping `intermediate_state` so the
    /// error-resume table can pick the run back up) and returns the original
    /// error. A cancellation is recorded with the fixed message `"cancelled"`
    /// rather than its error text.
    async fn fail(&self, entry: &mut RegistryEntry, err: ConnectorError) -> ConnectorResult<()> {
        entry.status = RegistryStatus::Error;
        entry.message = if matches!(err, ConnectorError::Cancelled) {
            "cancelled".to_string()
        } else {
            err.flatten_causes()
        };
        self.registry.save(entry).await?;
        Err(err)
    }

    /// Removes the local source/thumbnail/captions files a successful
    /// publish run staged. A cancellation here is never swallowed — it
    /// surfaces as `CleanupFailure` rather than the generic `Cancelled`.
    async fn cleanup(&self, video: &VideoDescriptor, cancel: &CancellationToken) -> ConnectorResult<()> {
        let mut filenames = vec![video.filename.as_str()];
        if let Some(f) = &video.image_filename {
            filenames.push(f);
        }
        if let Some(f) = &video.captions_filename {
            filenames.push(f);
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(ConnectorError::CleanupFailure {
                registry_id: video.video_id.clone(),
                reason: "cleanup cancelled".to_string(),
                source: None,
            }),
            result = self.local_sink.cleanup(&filenames) => result,
        }
    }
}

/// Races `fut` against cancellation, so any suspension point in the engine
/// returns promptly once the token fires instead of blocking out the run.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl std::future::Future<Output = ConnectorResult<T>>,
) -> ConnectorResult<T> {
    if cancel.is_cancelled() {
        return Err(ConnectorError::Cancelled);
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(ConnectorError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connector_core::{AssetRecord, MappingRecord, TargetPlatform};
    use connector_db::mapping::test_support::InMemoryMappingStore;
    use connector_db::registry::test_support::InMemoryRegistryStore;
    use connector_platform::platform::{PlatformAdapter, UpdateOutcome as PUO, UploadOutcome};
    use connector_storage::asset_catalog::test_support::InMemoryAssetCatalog;
    use connector_storage::thumbnail::test_support::InMemoryThumbnailStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Default)]
    struct StubAdapter {
        platform: Option<TargetPlatform>,
        fail_upload: AtomicBool,
        update_outcome: Option<PUO>,
    }

    impl StubAdapter {
        fn for_platform(platform: TargetPlatform) -> Self {
            Self {
                platform: Some(platform),
                fail_upload: AtomicBool::new(false),
                update_outcome: None,
            }
        }

        fn for_platform_with_update_outcome(platform: TargetPlatform, outcome: PUO) -> Self {
            Self {
                platform: Some(platform),
                fail_upload: AtomicBool::new(false),
                update_outcome: Some(outcome),
            }
        }
    }

    #[async_trait::async_trait]
    impl PlatformAdapter for StubAdapter {
        fn platform(&self) -> TargetPlatform {
            self.platform.unwrap()
        }

        async fn upload(
            &self,
            _video: &VideoDescriptor,
            _mapping: &MappingRecord,
            _registry: &RegistryEntry,
        ) -> ConnectorResult<UploadOutcome> {
            if self.fail_upload.load(Ordering::SeqCst) {
                return Err(ConnectorError::UploadFailed("stub upload failure".into()));
            }
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
        ) -> ConnectorResult<PUO> {
            Ok(self.update_outcome.unwrap_or(PUO::Updated))
        }

        async fn unpublish(
            &self,
            _mapping: &MappingRecord,
            _registry: &RegistryEntry,
        ) -> ConnectorResult<()> {
            Ok(())
        }
    }

    fn asset_with(download_url: &str) -> AssetRecord {
        AssetRecord {
            title: Some("T".into()),
            description: Some("D".into()),
            tags: None,
            flavour_source_url: Some(download_url.to_string()),
            download_url: None,
            image_id: None,
            captions_url: None,
        }
    }

    fn mapping() -> MappingRecord {
        MappingRecord {
            mapping_id: "m1".into(),
            target_id: "token-1".into(),
            target_platform: TargetPlatform::Facebook,
            category_id: "c1".into(),
        }
    }

    async fn engine_with(
        entry: RegistryEntry,
        adapter: StubAdapter,
        download_url: &str,
    ) -> (Engine, Arc<InMemoryRegistryStore>, tempfile::TempDir) {
        let registry = Arc::new(InMemoryRegistryStore::seeded(entry));
        let mappings = Arc::new(InMemoryMappingStore::new().with(mapping()));
        let assets = Arc::new(InMemoryAssetCatalog::new().with("v1", asset_with(download_url)));
        let thumbnails = Arc::new(InMemoryThumbnailStore::new());
        let router = PlatformRouter::new();
        router.register(Arc::new(adapter)).await;
        let dir = tempfile::tempdir().unwrap();
        let local_sink = LocalFileSink::new(dir.path());
        let http = reqwest::Client::new();

        let engine = Engine::new(registry.clone(), mappings, assets, thumbnails, router, local_sink, http);
        (engine, registry, dir)
    }

    #[tokio::test]
    async fn full_publish_run_downloads_uploads_and_cleans_up() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/a.mp4")
            .with_status(200)
            .with_body("video-bytes")
            .create_async()
            .await;
        let url = format!("{}/a.mp4", server.url());

        let entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        let (engine, registry, dir) =
            engine_with(entry, StubAdapter::for_platform(TargetPlatform::Facebook), &url).await;

        engine.update("r1", CancellationToken::new()).await.unwrap();

        let persisted = registry.load("r1").await.unwrap();
        assert_eq!(persisted.status, RegistryStatus::Active);
        assert_eq!(persisted.intermediate_state, IntermediateState::None);
        assert_eq!(persisted.target_platform_video_id, "remote-1");

        // the staged source file was cleaned up after the successful run
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unknown_destination_records_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/a.mp4")
            .with_status(200)
            .with_body("video-bytes")
            .create_async()
            .await;
        let url = format!("{}/a.mp4", server.url());

        let entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Youtube);
        let registry = Arc::new(InMemoryRegistryStore::seeded(entry));
        let mappings = Arc::new(InMemoryMappingStore::new().with(MappingRecord {
            mapping_id: "m1".into(),
            target_id: "token".into(),
            target_platform: TargetPlatform::Youtube,
            category_id: "c1".into(),
        }));
        let assets = Arc::new(InMemoryAssetCatalog::new().with("v1", asset_with(&url)));
        let thumbnails = Arc::new(InMemoryThumbnailStore::new());
        // No adapter registered for Youtube.
        let router = PlatformRouter::new();
        let dir = tempfile::tempdir().unwrap();
        let local_sink = LocalFileSink::new(dir.path());

        let engine = Engine::new(
            registry.clone(),
            mappings,
            assets,
            thumbnails,
            router,
            local_sink,
            reqwest::Client::new(),
        );

        let err = engine
            .update("r1", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::UnknownDestination { .. }));

        let persisted = registry.load("r1").await.unwrap();
        assert_eq!(persisted.status, RegistryStatus::Error);
    }

    #[tokio::test]
    async fn tamper_detected_skip_leaves_message_and_hash_unchanged() {
        let mut entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        entry.status = RegistryStatus::Active;
        entry.target_platform_video_id = "remote-1".into();
        entry.message = "previous run note".into();
        entry.video_hash_code = "stale-hash".into();

        let adapter = StubAdapter::for_platform_with_update_outcome(
            TargetPlatform::Facebook,
            PUO::SkippedTamperDetected,
        );
        let (engine, registry, _dir) = engine_with(entry, adapter, "http://unused/a.mp4").await;

        engine
            .update("r1", CancellationToken::new())
            .await
            .unwrap();

        let persisted = registry.load("r1").await.unwrap();
        assert_eq!(persisted.status, RegistryStatus::Active);
        assert_eq!(persisted.message, "previous run note");
        assert_eq!(persisted.video_hash_code, "stale-hash");
    }

    #[tokio::test]
    async fn ignored_event_status_pair_is_a_no_op_success() {
        let mut entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        entry.status = RegistryStatus::Deleted;
        let registry = Arc::new(InMemoryRegistryStore::seeded(entry));
        let mappings = Arc::new(InMemoryMappingStore::new().with(mapping()));
        let assets = Arc::new(InMemoryAssetCatalog::new());
        let thumbnails = Arc::new(InMemoryThumbnailStore::new());
        let router = PlatformRouter::new();
        let dir = tempfile::tempdir().unwrap();
        let local_sink = LocalFileSink::new(dir.path());

        let engine = Engine::new(
            registry.clone(),
            mappings,
            assets,
            thumbnails,
            router,
            local_sink,
            reqwest::Client::new(),
        );

        engine
            .unpublish("r1", CancellationToken::new())
            .await
            .unwrap();
        let persisted = registry.load("r1").await.unwrap();
        assert_eq!(persisted.status, RegistryStatus::Deleted);
    }

    #[tokio::test]
    async fn reactivate_on_inactive_update_is_a_local_status_flip() {
        let mut entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        entry.status = RegistryStatus::Inactive;
        entry.target_platform_video_id = "remote-1".into();
        let (engine, registry, _dir) =
            engine_with(entry, StubAdapter::for_platform(TargetPlatform::Facebook), "").await;

        engine.update("r1", CancellationToken::new()).await.unwrap();
        let persisted = registry.load("r1").await.unwrap();
        assert_eq!(persisted.status, RegistryStatus::Active);
        assert_eq!(persisted.intermediate_state, IntermediateState::None);
    }

    #[tokio::test]
    async fn delete_without_remote_id_skips_the_adapter_call() {
        let entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        let (engine, registry, _dir) =
            engine_with(entry, StubAdapter::for_platform(TargetPlatform::Facebook), "").await;

        engine.delete("r1", CancellationToken::new()).await.unwrap();
        let persisted = registry.load("r1").await.unwrap();
        assert_eq!(persisted.status, RegistryStatus::Deleted);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_any_adapter_call() {
        let entry = RegistryEntry::new("r1", "v1", "c1", "m1", TargetPlatform::Facebook);
        let (engine, registry, _dir) =
            engine_with(entry, StubAdapter::for_platform(TargetPlatform::Facebook), "").await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine.update("r1", cancel).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Cancelled));

        let persisted = registry.load("r1").await.unwrap();
        assert_eq!(persisted.status, RegistryStatus::Error);
        assert_eq!(persisted.message, "cancelled");
    }
}
