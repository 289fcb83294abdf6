//! Server configuration loaded from the environment.

use std::str::FromStr;

use anyhow::Context;

const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 30;
const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Runtime settings for the HTTP server and database pool.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub database_max_connections: u32,
    pub session_ttl_hours: i64,
    pub max_image_bytes: usize,
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// Required env vars:
    /// - DATABASE_URL: PostgreSQL connection string
    ///
    /// Optional env vars:
    /// - HOST (default "0.0.0.0"), PORT (default 3000)
    /// - DATABASE_MAX_CONNECTIONS (default 10)
    /// - SESSION_TTL_HOURS (default 720)
    /// - MAX_IMAGE_BYTES (default 5 MiB)
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            database_url,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 3000)?,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
            session_ttl_hours: env_or("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?,
            max_image_bytes: env_or("MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES)?,
        })
    }

    /// Defaults for everything but the database URL.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_max_connections: 10,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}
