//! Service configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. defaults in code
//! 2. `config/{environment}.toml` (optional)
//! 3. environment variables such as `STOCKPOOL_SERVER__PORT=9090`
//!
//! A `.env` file in the working directory is loaded into the process
//! environment first.

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use stockpool_infra::EngineConfig;
use stockpool_observability::LogFormat;

/// Signing secret used when none is configured. Only fit for local runs.
pub const DEV_JWT_SECRET: &str = "dev-secret";

const ENV_PREFIX: &str = "STOCKPOOL";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Current environment (development, production, ...).
    pub environment: String,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret for bearer tokens.
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
}

impl AppConfig {
    /// Load configuration from `.env`, files and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let environment =
            std::env::var("STOCKPOOL_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        Self::load_from(&environment, env_source())
    }

    /// Load with an explicit environment-variable source.
    pub fn load_from(environment: &str, env: Environment) -> Result<Self, ConfigError> {
        let engine = EngineConfig::default();

        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080_i64)?
            .set_default("auth.jwt_secret", DEV_JWT_SECRET)?
            .set_default("log.format", "json")?
            .set_default("engine.default_category_prefix", engine.default_category_prefix)?
            .set_default("engine.code_width", engine.code_width as i64)?
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }
}

/// `STOCKPOOL_` prefix, `__` between nested keys.
pub fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
