use std::sync::Arc;

use anyhow::Context;
use shipline_broker::{Broker, BrokerConfig};
use shipline_server::api::{self, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting shipline server");
    let config_path =
        std::env::var("SHIPLINE_CONFIG").unwrap_or_else(|_| "shipline.toml".to_string());
    info!(path = %config_path, "loading broker config");
    let config = BrokerConfig::from_file(&config_path)
        .with_context(|| format!("failed to load broker config from {config_path}"))?;
    let bind_addr = config.bind_addr.clone();

    let broker = Broker::new(config).context("failed to initialize broker")?;
    let state = Arc::new(AppState::new(Arc::new(broker)));
    let router = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "server is ready, press Ctrl+C to shut down");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received, stopping server");
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
