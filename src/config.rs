//! Service configuration from environment variables.

use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("INTERNAL_API_TOKEN must be set to a non-empty value")]
    MissingApiToken,
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token required on every API request.
    pub api_token: String,
    /// Deployment environment name, reported by /health.
    pub environment: String,
    /// HTTP listen port.
    pub port: u16,
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// The API token is mandatory: the service refuses to start without it
    /// rather than coming up unauthenticated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var("INTERNAL_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingApiToken)?;

        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            api_token,
            environment,
            port,
        })
    }
}
