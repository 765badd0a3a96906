//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

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
    pub database_url: String,
    pub log_level: Level,
    /// Origin of the browser front-end allowed through CORS.
    pub allowed_origin: String,
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

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        // The store is a local file; a missing URL means the default file next to the binary.
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://stichelbuch.db?mode=rwc".to_string());
        if !database_url.starts_with("sqlite:") {
            return Err(ConfigError::InvalidValue(
                "DATABASE_URL".to_string(),
                format!("'{}' is not a sqlite URL", database_url),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());
        if allowed_origin.trim().is_empty() {
            return Err(ConfigError::MissingVar("ALLOWED_ORIGIN".to_string()));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            allowed_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-global, so every case runs in one test.
    #[test]
    fn defaults_and_invalid_values() {
        for var in ["BIND_ADDRESS", "DATABASE_URL", "RUST_LOG", "ALLOWED_ORIGIN"] {
            std::env::remove_var(var);
        }
        let config = Config::from_env().expect("defaults are valid");
        assert_eq!(config.bind_address, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.database_url.starts_with("sqlite:"));

        std::env::set_var("DATABASE_URL", "postgres://localhost/db");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(var, _)) if var == "DATABASE_URL"
        ));
        std::env::remove_var("DATABASE_URL");

        std::env::set_var("RUST_LOG", "chatty");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(var, _)) if var == "RUST_LOG"
        ));
        std::env::remove_var("RUST_LOG");
    }
}
