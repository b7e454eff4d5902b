use anyhow::Context;
use tracing::info;

use ontym::{AppState, OnTymConfig, VERSION, telemetry, web};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("A rustls crypto provider is already installed"))?;

    let config = OnTymConfig::load().context("Failed to load configuration")?;
    let _telemetry = telemetry::init(&config.logging)?;

    info!(version = VERSION, store = %config.store.path, "Starting OnTym");
    if config.ai.api_key.is_none() {
        tracing::warn!("No AI api key configured; /api/recommend and /api/chat will fail");
    }
    if config.air_quality.api_key.is_none() {
        tracing::warn!("No air-quality api key configured; /api/air-quality will fail");
    }

    let state = AppState::from_config(config)?.shared();
    web::run(state).await
}
