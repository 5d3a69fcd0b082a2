//! Binary entrypoint for the publishing connector's HTTP trigger surface.

mod error;
mod handlers;
mod mcn_credentials;
mod middleware;
mod setup;
mod state;

use connector_core::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let (_state, app) = setup::initialize_app(config.clone()).await?;
    setup::server::start_server(&config, app).await
}
