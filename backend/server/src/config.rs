use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressBackend {
    Redis,
    Memory,
}

impl FromStr for ProgressBackend {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected redis or memory, got {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub lock_timeout_ms: u64,
}

impl PostgresConfig {
    pub fn load() -> Result<Self> {
        Ok(Self {
            host: try_load("POSTGRES_HOST", "postgres")?,
            port: try_load("POSTGRES_PORT", "5432")?,
            user: try_load("POSTGRES_USER", "gabconcours")?,
            password: read_secret("POSTGRES_PASSWORD")?,
            database: try_load("POSTGRES_DB", "gabconcours")?,
            max_connections: try_load("POSTGRES_MAX_CONNECTIONS", "10")?,
            lock_timeout_ms: try_load("LOCK_TIMEOUT_MS", "2000")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub postgres: PostgresConfig,
    pub progress_backend: ProgressBackend,
    pub redis_url: String,
    pub progress_ttl_secs: u64,
    pub mail_relay_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            postgres: PostgresConfig::load()?,
            progress_backend: try_load("PROGRESS_BACKEND", "redis")?,
            redis_url: try_load("REDIS_URL", "redis://redis:6379")?,
            progress_ttl_secs: try_load("PROGRESS_TTL_SECS", "31536000")?,
            mail_relay_url: var("MAIL_RELAY_URL").ok(),
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    parse_value(key, &raw)
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value {raw:?}: {e}"))
}

fn read_secret(secret_name: &str) -> Result<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .with_context(|| format!("Failed to read {secret_name} from {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        let port: u16 = parse_value("RUST_PORT", "8080").unwrap();
        assert_eq!(port, 8080);

        assert!(parse_value::<u16>("RUST_PORT", "99999").is_err());
        assert!(parse_value::<u64>("LOCK_TIMEOUT_MS", "-1").is_err());
    }

    #[test]
    fn test_progress_backend() {
        let backend: ProgressBackend = parse_value("PROGRESS_BACKEND", "memory").unwrap();
        assert_eq!(backend, ProgressBackend::Memory);

        assert!(parse_value::<ProgressBackend>("PROGRESS_BACKEND", "sqlite").is_err());
    }
}
