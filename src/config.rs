use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;

use crate::domain::GridConstants;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub grid: GridConstants,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}
impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Native engine start-up policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempt the native engine at start-up
    pub native_enabled: bool,
    /// Check native output against the fallback before routing to it
    pub self_test: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { native_enabled: true, self_test: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset
    pub filter: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info,hyper=warn,tower_http=info".to_string(),
            format: LogFormat::Json,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("GRID__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract()?;
        if let Err(e) = cfg.grid.validate() {
            anyhow::bail!("invalid [grid] configuration: {}", e);
        }
        Ok(cfg)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                enable_cors: true,
                request_timeout_secs: default_request_timeout_secs(),
            },
            engine: EngineConfig::default(),
            grid: GridConstants::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}
