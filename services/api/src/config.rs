//! services/api/src/config.rs
//!
//! Defines the proxy's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::{IpAddr, SocketAddr};
use tracing::Level;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.asimodel.com/v1";
pub const DEFAULT_UPSTREAM_MODEL: &str = "asi1";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Absent when history endpoints should stay disabled.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub upstream_api_key: Option<String>,
    pub upstream_base_url: String,
    pub upstream_model: String,
    /// Absent means any origin is allowed.
    pub cors_allow_origin: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // --- Server Settings ---
        let host_str = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let host = host_str
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidValue("HOST".to_string(), e.to_string()))?;

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?,
            None => DEFAULT_PORT,
        };
        let bind_address = SocketAddr::new(host, port);

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Document Store (optional) ---
        let database_url = var("DATABASE_URL");

        // --- Upstream Model API ---
        let upstream_api_key = var("ASI1_API_KEY");
        let upstream_base_url = var("ASI1_BASE_URL")
            .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !upstream_base_url.starts_with("http://") && !upstream_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "ASI1_BASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", upstream_base_url),
            ));
        }
        let upstream_model =
            var("ASI1_MODEL").unwrap_or_else(|| DEFAULT_UPSTREAM_MODEL.to_string());

        let cors_allow_origin = var("CORS_ALLOW_ORIGIN");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            upstream_api_key,
            upstream_base_url,
            upstream_model,
            cors_allow_origin,
        })
    }
}
