//! Application setup and initialization.
//!
//! All collaborator wiring lives here so `main.rs` stays a thin bootstrap:
//! load config, build the database pool, build every adapter the
//! `PlatformRouter` can reach, hand it all to the `Engine`, build routes.

pub mod database;
pub mod routes;
pub mod server;

use crate::mcn_credentials::ServiceAccountCredentialSource;
use crate::state::AppState;
use anyhow::{Context, Result};
use connector_core::Config;
use connector_db::{MappingStore, PgMappingStore, PgRegistryStore, RegistryStore};
use connector_engine::Engine;
use connector_platform::{
    FacebookAdapter, FacebookCredentialSource, LiveFacebookGraphClient, LiveYoutubeClient,
    PlatformRouter, YoutubeDirectAdapter, YoutubeDirectCredentialSource, YoutubeMcnAdapter,
};
use connector_storage::{HttpAssetCatalog, HttpThumbnailStore, LocalFileSink};
use std::sync::Arc;

const YOUTUBE_UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtubepartner";

/// Initialize the entire application: database, collaborators, routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    connector_infra::init_telemetry().map_err(|e| anyhow::anyhow!("telemetry init failed: {e}"))?;
    tracing::info!("configuration loaded");

    let pool = database::setup_database(&config).await?;
    let engine = Arc::new(build_engine(&config, pool.clone()).await?);

    let state = Arc::new(AppState {
        engine,
        config: config.clone(),
        pool,
    });

    let router = routes::setup_routes(&config, state.clone()).await?;
    Ok((state, router))
}

async fn build_engine(config: &Config, pool: sqlx::PgPool) -> Result<Engine> {
    let http = reqwest::Client::new();

    let registry: Arc<dyn RegistryStore> = Arc::new(PgRegistryStore::new(pool.clone()));
    let mappings: Arc<dyn MappingStore> = Arc::new(PgMappingStore::new(pool));
    let assets = Arc::new(HttpAssetCatalog::new(
        http.clone(),
        config.asset_catalog_base_url.clone(),
    ));
    let thumbnails = Arc::new(HttpThumbnailStore::new(
        http.clone(),
        config.thumbnail_store_base_url.clone(),
    ));
    let local_sink = LocalFileSink::new(config.work_dir.clone());

    let router = PlatformRouter::new();

    let facebook_graph = Arc::new(LiveFacebookGraphClient::new(
        http.clone(),
        config.facebook_graph_base_url.clone(),
    ));
    router
        .register(Arc::new(FacebookAdapter::new(
            facebook_graph,
            Arc::new(FacebookCredentialSource),
            local_sink.clone(),
        )))
        .await;

    let youtube_client = Arc::new(LiveYoutubeClient::new(
        http.clone(),
        config.youtube_data_api_base_url.clone(),
        config.youtube_partner_api_base_url.clone(),
    ));

    if let (Some(client_id), Some(client_secret)) =
        (&config.youtube_client_id, &config.youtube_client_secret)
    {
        let direct_credentials = Arc::new(YoutubeDirectCredentialSource::new(
            http.clone(),
            config.youtube_token_uri.clone(),
            client_id.clone(),
            client_secret.clone(),
        ));
        router
            .register(Arc::new(YoutubeDirectAdapter::new(
                youtube_client.clone(),
                direct_credentials,
                local_sink.clone(),
            )))
            .await;
    } else {
        tracing::warn!("YOUTUBE_CLIENT_ID/SECRET not set; youtube_direct destination disabled");
    }

    if let Some(key_path) = &config.youtube_mcn_service_account_key_path {
        let key_contents = std::fs::read_to_string(key_path)
            .with_context(|| format!("failed to read MCN service account key at {key_path}"))?;
        let mcn_credentials = Arc::new(ServiceAccountCredentialSource::from_key_file(
            http.clone(),
            &key_contents,
            YOUTUBE_UPLOAD_SCOPE,
        )?);
        router
            .register(Arc::new(YoutubeMcnAdapter::new(
                youtube_client,
                mcn_credentials,
                local_sink.clone(),
            )))
            .await;
    } else {
        tracing::warn!("YOUTUBE_MCN_SERVICE_ACCOUNT_KEY_PATH not set; youtube (MCN) destination disabled");
    }

    Ok(Engine::new(
        registry, mappings, assets, thumbnails, router, local_sink, http,
    ))
}
