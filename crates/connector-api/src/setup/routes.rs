//! Route configuration and setup.

use crate::handlers::registry;
use crate::middleware::security_headers::{security_headers_middleware, SecurityHeadersConfig};
use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, routing::get, routing::post, Json, Router};
use connector_core::Config;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub async fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let security_headers_config = Arc::new(SecurityHeadersConfig::new(!config.test_mode));

    let app = Router::new()
        .route("/health", get(liveness))
        .route("/registry/{registry_id}/update", post(registry::update))
        .route("/registry/{registry_id}/unpublish", post(registry::unpublish))
        .route("/registry/{registry_id}/delete", post(registry::delete))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            security_headers_config,
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "alive" })))
}
