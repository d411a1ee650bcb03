//! Configuration management for the server.

use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL; documents stay in memory without it
    pub database_url: Option<String>,
    /// Pool size for PostgreSQL
    pub max_connections: u32,
    /// Shared key clients must present; the server is open without it
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            max_connections: 10,
            api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration through `var`, which returns the value of a
    /// variable if set.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        // Empty values count as unset
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or(defaults.host);

        let port = match var("PORT") {
            Some(port) => port.parse::<u16>().map_err(|_| ConfigError::InvalidPort(port))?,
            None => defaults.port,
        };

        let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(max) => max
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidMaxConnections(max))?,
            None => defaults.max_connections,
        };

        Ok(Self {
            host,
            port,
            database_url: var("DATABASE_URL"),
            max_connections,
            api_key: var("API_KEY"),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value: {0}")]
    InvalidPort(String),

    #[error("Invalid DATABASE_MAX_CONNECTIONS value: {0}")]
    InvalidMaxConnections(String),
}
