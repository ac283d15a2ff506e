//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind (default: all interfaces)
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: match lookup("PORT") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                None => defaults.port,
            },
        };

        // Fail at startup rather than at bind time
        config.socket_addr()?;

        Ok(config)
    }

    /// The full listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BIND_ADDR".to_string()))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
