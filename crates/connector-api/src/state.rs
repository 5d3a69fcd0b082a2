//! Application state shared across handlers.

use connector_core::Config;
use connector_engine::Engine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: Config,
    pub pool: sqlx::PgPool,
}
