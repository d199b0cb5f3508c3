use std::env;
use thiserror::Error;

use crate::services::provider::{DIGITALOCEAN_API_BASE, HETZNER_API_BASE};
use crate::services::validator::DEFAULT_PROBE_ATTEMPTS;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    // Plan limit on active servers per team (None = unlimited)
    pub team_server_limit: Option<u32>,
    // Provider API endpoints (overridable for staging and tests)
    pub hetzner_api_base: String,
    pub digitalocean_api_base: String,
    // Post-create SSH reachability probe
    pub validate_probe_attempts: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

fn parse_var<T>(var: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env::var(var)
        .ok()
        .map(|v| {
            v.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                var: var.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Skip loading .env in test mode to allow tests to control env vars
        if env::var("CLOUDPROV_TEST_MODE").is_err() {
            dotenvy::dotenv().ok();
        }

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = parse_var::<u16>("PORT")?.unwrap_or(8080);

        let team_server_limit = parse_var::<u32>("TEAM_SERVER_LIMIT")?;

        let hetzner_api_base =
            env::var("HETZNER_API_BASE").unwrap_or_else(|_| HETZNER_API_BASE.to_string());

        let digitalocean_api_base = env::var("DIGITALOCEAN_API_BASE")
            .unwrap_or_else(|_| DIGITALOCEAN_API_BASE.to_string());

        let validate_probe_attempts = parse_var::<u32>("VALIDATE_PROBE_ATTEMPTS")?
            .unwrap_or(DEFAULT_PROBE_ATTEMPTS);

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            team_server_limit,
            hetzner_api_base,
            digitalocean_api_base,
            validate_probe_attempts,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
