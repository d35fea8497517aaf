use crate::core::{AppError, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

pub mod database;
pub mod reconciliation;
pub mod server;

pub use database::DatabaseConfig;
pub use reconciliation::ReconciliationConfig;
pub use server::ServerConfig;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl AppConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> String {
        format!("loanledger={},actix_web=info", self.log_level)
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Read `name` through `get` and parse it, falling back to `default` when unset
pub(crate) fn parse_var<T, F>(get: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}: {}", name, raw))),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_source(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_source<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            app: AppConfig {
                env: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
                log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                log_format: parse_var(&get, "LOG_FORMAT", LogFormat::Pretty)?,
            },
            database: DatabaseConfig::from_source(&get)?,
            server: ServerConfig::from_source(&get)?,
            reconciliation: ReconciliationConfig::from_source(&get)?,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Configuration(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.server.workers == 0 {
            return Err(AppError::Configuration(
                "Server workers must be greater than 0".to_string(),
            ));
        }

        self.database.validate()?;
        self.reconciliation.validate()?;

        if self.app.env == "production" && self.database.url.is_none() {
            return Err(AppError::Configuration(
                "DATABASE_URL is required in production".to_string(),
            ));
        }

        Ok(())
    }
}
