//! The three trigger endpoints: `update`, `unpublish`, `delete`, each keyed
//! by `registry_id`. A run is not expected to be cancelled from outside an
//! HTTP request's own lifetime, so each handler hands the engine a fresh
//! token and never cancels it itself.

use crate::error::{HttpConnectorError, TriggerResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(registry_id): Path<String>,
) -> Result<Json<TriggerResponse>, HttpConnectorError> {
    state
        .engine
        .update(&registry_id, CancellationToken::new())
        .await?;
    Ok(Json(TriggerResponse::success()))
}

pub async fn unpublish(
    State(state): State<Arc<AppState>>,
    Path(registry_id): Path<String>,
) -> Result<Json<TriggerResponse>, HttpConnectorError> {
    state
        .engine
        .unpublish(&registry_id, CancellationToken::new())
        .await?;
    Ok(Json(TriggerResponse::success()))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(registry_id): Path<String>,
) -> Result<Json<TriggerResponse>, HttpConnectorError> {
    state
        .engine
        .delete(&registry_id, CancellationToken::new())
        .await?;
    Ok(Json(TriggerResponse::success()))
}
