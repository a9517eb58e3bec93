use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every setting has a default so a bare `cargo run` talks to a local MongoDB.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub db_driver: String,
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    /// Upper bound for a single store round-trip, applied by callers that opt in.
    pub store_timeout: Duration,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 8090,
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(5),
            db_driver: "mongodb".to_string(),
            db_host: "localhost".to_string(),
            db_port: 27017,
            db_name: "matching".to_string(),
            store_timeout: Duration::from_secs(150),
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        Ok(Config {
            host: env_or("HOST", defaults.host),
            port: parse_env("PORT", defaults.port)?,
            read_timeout: secs_env("READ_TIMEOUT_SECS", defaults.read_timeout)?,
            write_timeout: secs_env("WRITE_TIMEOUT_SECS", defaults.write_timeout)?,
            shutdown_timeout: secs_env("SHUTDOWN_TIMEOUT_SECS", defaults.shutdown_timeout)?,
            db_driver: env_or("DB_DRIVER", defaults.db_driver),
            db_host: env_or("DB_HOST", defaults.db_host),
            db_port: parse_env("DB_PORT", defaults.db_port)?,
            db_name: env_or("DB_NAME", defaults.db_name),
            store_timeout: secs_env("STORE_TIMEOUT_SECS", defaults.store_timeout)?,
            rust_log: env_or("RUST_LOG", defaults.rust_log),
        })
    }

    /// Listen address in the form `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_uri(&self) -> String {
        format!(
            "{}://{}:{}/?retryWrites=false",
            self.db_driver, self.db_host, self.db_port
        )
    }

    /// Deadline for a whole request: read plus write budget, and never less
    /// than the store timeout plus the write budget.
    pub fn request_timeout(&self) -> Duration {
        (self.read_timeout + self.write_timeout).max(self.store_timeout + self.write_timeout)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn secs_env(key: &str, default: Duration) -> Result<Duration> {
    parse_env(key, default.as_secs()).map(Duration::from_secs)
}
