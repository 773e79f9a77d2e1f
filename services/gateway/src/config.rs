use common::config::load_yaml;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] common::config::ConfigLoadError),
    #[error("invalid app: {0}")]
    App(String),
    #[error("invalid services.coderun-sso: {0}")]
    SsoService(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default)]
    pub env: String,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    pub http: Http,
}

#[derive(Debug, Deserialize)]
pub struct SsoServiceConfig {
    pub host: String,
    pub port: String,
}

#[derive(Debug, Deserialize)]
pub struct Services {
    #[serde(rename = "coderun-sso")]
    pub coderun_sso: SsoServiceConfig,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: App,
    pub server: ServerSection,
    pub services: Services,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let mut config: Config = load_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Environment gating mirrors `rest-gateway/internal/infrastructure/http/handlers/handlers.go`'s
    /// `switch cfg.App.Env`: `local`/`dev` get permissive defaults,
    /// `prod` is locked down, anything else is a startup error.
    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.app.env.is_empty() {
            self.app.env = "dev".to_string();
        }
        match self.app.env.as_str() {
            "local" | "dev" | "prod" => {}
            other => {
                return Err(ConfigError::App(format!(
                    "invalid environment: {other}"
                )));
            }
        }
        if self.server.http.host.is_empty() {
            self.server.http.host = "localhost".to_string();
        }
        if self.server.http.port.is_empty() {
            self.server.http.port = "9090".to_string();
        }
        if self.services.coderun_sso.host.is_empty() {
            return Err(ConfigError::SsoService("invalid host".to_string()));
        }
        if self.services.coderun_sso.port.is_empty() {
            return Err(ConfigError::SsoService("invalid port".to_string()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.http.host, self.server.http.port)
    }

    pub fn sso_endpoint(&self) -> String {
        format!(
            "http://{}:{}",
            self.services.coderun_sso.host, self.services.coderun_sso.port
        )
    }

    pub fn is_production(&self) -> bool {
        self.app.env == "prod"
    }
}
