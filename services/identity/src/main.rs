use std::{env, fs, sync::Arc};

use anyhow::{Context, Result};
use coderun_identity::{
    config::Config, grpc::SsoGrpcService, interceptor::AuthInterceptor,
    repository::MongoUserRepository, service::IdentityService, session::RedisSessionStore,
    token::TokenManager,
};
use mongodb::Client;
use proto::sso::v1::sso_service_server::SsoServiceServer;
use tonic::transport::Server;

#[tokio::main]
async fn main() -> Result<()> {
    common::logging::init("info,coderun_identity=debug");

    let config_path = env::var("APP_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path).context("failed to load config")?;

    let private_key =
        fs::read(&config.secrets.jwt.private_key_path).context("failed to read jwt private key")?;
    let public_key =
        fs::read(&config.secrets.jwt.public_key_path).context("failed to read jwt public key")?;
    let tokens = Arc::new(TokenManager::new(
        &private_key,
        &public_key,
        config.secrets.jwt.access_ttl_seconds,
    )?);

    let sessions = Arc::new(RedisSessionStore::connect(&config.redis_url()).await?);

    let mongo_client = Client::with_uri_str(&config.secrets.mongo.uri).await?;
    let database = mongo_client.database(&config.secrets.mongo.database);
    let repository = MongoUserRepository::new(&database);
    repository.ensure_indexes().await?;

    let identity = IdentityService::new(
        Arc::new(repository),
        sessions,
        tokens.clone(),
        config.secrets.jwt.refresh_ttl_seconds,
    );

    let addr = config.grpc_addr().parse()?;
    tracing::info!(%addr, "identity service listening");

    let service = SsoGrpcService::new(identity);
    let interceptor = AuthInterceptor::new(tokens);

    Server::builder()
        .add_service(SsoServiceServer::with_interceptor(service, interceptor))
        .serve(addr)
        .await?;

    Ok(())
}
