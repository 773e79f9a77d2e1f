use common::config::load_yaml;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::ImageConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] common::config::ConfigLoadError),
    #[error("invalid secrets.docker: {0}")]
    Docker(String),
    #[error("invalid secrets.jwt: {0}")]
    Jwt(String),
    #[error("invalid service: {0}")]
    Service(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default)]
    pub env: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct Features {
    #[serde(default, rename = "clickhouse-enable")]
    pub clickhouse_enable: bool,
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
pub struct DockerSecrets {
    #[serde(rename = "image-go")]
    pub image_go: String,
    #[serde(rename = "image-python")]
    pub image_python: String,
}

#[derive(Debug, Deserialize)]
pub struct JwtSecrets {
    #[serde(rename = "public-key-path")]
    pub public_key_path: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ClickhouseSecrets {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub database: String,
}

#[derive(Debug, Deserialize)]
pub struct Secrets {
    pub docker: DockerSecrets,
    pub jwt: JwtSecrets,
    #[serde(default)]
    pub clickhouse: ClickhouseSecrets,
}

#[derive(Debug, Deserialize)]
pub struct LogSection {
    #[serde(default, rename = "buf-size")]
    pub buf_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct ServiceSection {
    #[serde(default, rename = "max-timeout")]
    pub max_timeout_seconds: u32,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub features: Features,
    pub server: ServerSection,
    pub secrets: Secrets,
    pub service: ServiceSection,
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
            self.server.grpc.port = "9092".to_string();
        }
        if self.secrets.docker.image_go.is_empty() {
            return Err(ConfigError::Docker("missing image-go".to_string()));
        }
        if self.secrets.docker.image_python.is_empty() {
            return Err(ConfigError::Docker("missing image-python".to_string()));
        }
        if self.secrets.jwt.public_key_path.is_empty() {
            return Err(ConfigError::Jwt("missing public-key-path".to_string()));
        }
        if self.service.max_timeout_seconds == 0 {
            self.service.max_timeout_seconds = 30;
        }
        if self.service.log.buf_size == 0 {
            self.service.log.buf_size = 1024;
        }
        if self.features.clickhouse_enable {
            if self.secrets.clickhouse.host.is_empty() {
                return Err(ConfigError::Service(
                    "clickhouse enabled but secrets.clickhouse.host is missing".to_string(),
                ));
            }
            if self.secrets.clickhouse.database.is_empty() {
                return Err(ConfigError::Service(
                    "clickhouse enabled but secrets.clickhouse.database is missing".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn image_config(&self) -> ImageConfig {
        ImageConfig {
            go: self.secrets.docker.image_go.clone(),
            python: self.secrets.docker.image_python.clone(),
        }
    }

    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.server.grpc.host, self.server.grpc.port)
    }
}
