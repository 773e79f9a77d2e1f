use std::env;

use anyhow::{Context, Result};
use coderun_gateway::{
    config::Config,
    server::{AppState, build_router},
};
use proto::sso::v1::sso_service_client::SsoServiceClient;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    common::logging::init("info,coderun_gateway=debug");

    let config_path = env::var("APP_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path).context("failed to load config")?;

    if config.is_production() {
        tracing::info!("starting gateway in production mode");
    }

    let sso = SsoServiceClient::connect(config.sso_endpoint())
        .await
        .context("failed to connect to identity service")?;

    let state = AppState::new(sso);
    let router = build_router(state);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "gateway listening");
    axum::serve(listener, router).await?;

    Ok(())
}
