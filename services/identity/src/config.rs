use common::config::load_yaml;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] common::config::ConfigLoadError),
    #[error("invalid app: {0}")]
    App(String),
    #[error("invalid server.grpc: {0}")]
    Grpc(String),
    #[error("invalid secrets.jwt: {0}")]
    Jwt(String),
    #[error("invalid secrets.redis: {0}")]
    Redis(String),
    #[error("invalid secrets.mongo: {0}")]
    Mongo(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default)]
    pub env: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Grpc {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    pub grpc: Grpc,
}

#[derive(Debug, Deserialize)]
pub struct JwtSecrets {
    #[serde(rename = "private-key-path")]
    pub private_key_path: String,
    #[serde(rename = "public-key-path")]
    pub public_key_path: String,
    #[serde(default, rename = "access-ttl-seconds")]
    pub access_ttl_seconds: i64,
    #[serde(default, rename = "refresh-ttl-seconds")]
    pub refresh_ttl_seconds: i64,
}

#[derive(Debug, Deserialize)]
pub struct RedisSecrets {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub db: u8,
}

#[derive(Debug, Deserialize)]
pub struct MongoSecrets {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Deserialize)]
pub struct Secrets {
    pub jwt: JwtSecrets,
    pub redis: RedisSecrets,
    pub mongo: MongoSecrets,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: App,
    pub server: ServerSection,
    pub secrets: Secrets,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let mut config: Config = load_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.app.env.is_empty() {
            self.app.env = "dev".to_string();
        }
        if self.server.grpc.host.is_empty() {
            self.server.grpc.host = "0.0.0.0".to_string();
        }
        if self.server.grpc.port.is_empty() {
            self.server.grpc.port = "9091".to_string();
        }
        if self.secrets.jwt.private_key_path.is_empty() {
            return Err(ConfigError::Jwt("missing private-key-path".to_string()));
        }
        if self.secrets.jwt.public_key_path.is_empty() {
            return Err(ConfigError::Jwt("missing public-key-path".to_string()));
        }
        if self.secrets.jwt.access_ttl_seconds <= 0 {
            self.secrets.jwt.access_ttl_seconds = 15 * 60;
        }
        if self.secrets.jwt.refresh_ttl_seconds <= 0 {
            self.secrets.jwt.refresh_ttl_seconds = 7 * 24 * 60 * 60;
        }
        if self.secrets.redis.host.is_empty() {
            self.secrets.redis.host = "localhost".to_string();
        }
        if self.secrets.redis.port.is_empty() {
            self.secrets.redis.port = "6379".to_string();
        }
        if self.secrets.mongo.uri.is_empty() {
            return Err(ConfigError::Mongo("missing uri".to_string()));
        }
        if self.secrets.mongo.database.is_empty() {
            return Err(ConfigError::Mongo("missing database".to_string()));
        }
        Ok(())
    }

    pub fn redis_url(&self) -> String {
        if self.secrets.redis.password.is_empty() {
            format!(
                "redis://{}:{}/{}",
                self.secrets.redis.host, self.secrets.redis.port, self.secrets.redis.db
            )
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                self.secrets.redis.password,
                self.secrets.redis.host,
                self.secrets.redis.port,
                self.secrets.redis.db
            )
        }
    }

    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.server.grpc.host, self.server.grpc.port)
    }
}
