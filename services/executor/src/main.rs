use std::{env, fs, sync::Arc};

use anyhow::{Context, Result};
use coderun_executor::{
    auth::ExecutorAuthInterceptor, clickhouse::Telemetry, config::Config,
    container::BollardRuntime, grpc::XcutrGrpcService, service::ExecutorService,
};
use common::auth::AccessTokenVerifier;
use proto::xcutr::v1::xcutr_service_server::XcutrServiceServer;
use tonic::transport::Server;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

#[tokio::main]
async fn main() -> Result<()> {
    common::logging::init("info,coderun_executor=debug");

    let config_path = env::var("APP_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path).context("failed to load config")?;

    let public_key =
        fs::read(&config.secrets.jwt.public_key_path).context("failed to read jwt public key")?;
    let verifier = Arc::new(
        AccessTokenVerifier::from_public_key_pem(&public_key)
            .context("failed to load jwt public key")?,
    );

    let telemetry = if config.features.clickhouse_enable {
        tracing::info!("clickhouse telemetry is enabled");
        #[cfg(feature = "clickhouse-telemetry")]
        {
            let client = coderun_executor::clickhouse::ClickhouseClient::connect(
                &config.secrets.clickhouse,
            );
            client
                .run_migrations()
                .await
                .context("failed to run clickhouse migrations")?;
            Telemetry::enabled(client)
        }
        #[cfg(not(feature = "clickhouse-telemetry"))]
        {
            tracing::warn!(
                "features.clickhouse-enable is set but this binary was built without the \
                 clickhouse-telemetry feature; telemetry writes will be skipped"
            );
            Telemetry::disabled()
        }
    } else {
        Telemetry::disabled()
    };

    let runtime = Arc::new(BollardRuntime::connect().context("failed to connect to docker")?);
    let executor = ExecutorService::new(
        runtime,
        config.image_config(),
        config.service.log.buf_size,
    );

    let addr = config.grpc_addr().parse()?;
    tracing::info!(%addr, "executor service listening");

    let max_timeout_nanos = i64::from(config.service.max_timeout_seconds) * NANOS_PER_SECOND;
    let service = XcutrGrpcService::new(executor, telemetry, max_timeout_nanos);
    let interceptor = ExecutorAuthInterceptor::new(verifier);

    Server::builder()
        .add_service(XcutrServiceServer::with_interceptor(service, interceptor))
        .serve(addr)
        .await?;

    Ok(())
}
