//! Connection pool construction.
//!
//! The connection string comes from `DATABASE_URL`, or is assembled from the
//! `POSTGRES_*` parts when that is unset.

use anyhow::{anyhow, Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Database pool configuration
#[derive(Clone, Debug)]
pub struct DbPoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum lifetime of a connection
    pub max_lifetime: Duration,
    /// Maximum idle time before a connection is closed
    pub idle_timeout: Duration,
    /// Connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbPoolConfig {
    fn default() -> Self {
        // One writer per live game plus the sync pass; a week rarely has
        // more than a handful of concurrent games.
        Self {
            max_connections: 10,
            min_connections: 1,
            max_lifetime: Duration::from_secs(1800),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl DbPoolConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_connections: env::var("DB_POOL_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            min_connections: env::var("DB_POOL_MIN_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_connections),
            max_lifetime: env::var("DB_POOL_MAX_LIFETIME_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_lifetime),
            idle_timeout: env::var("DB_POOL_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            acquire_timeout: env::var("DB_POOL_ACQUIRE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
        }
    }
}

/// Connection string parts, as split across `POSTGRES_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgUrlParts {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
    pub ssl_mode: String,
    /// Extra query parameters appended verbatim, e.g. `options=...`
    pub option: Option<String>,
}

impl PgUrlParts {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            user: env::var("POSTGRES_USER").context("POSTGRES_USER must be set")?,
            password: env::var("POSTGRES_PASSWORD").unwrap_or_default(),
            database: env::var("POSTGRES_DATABASE").context("POSTGRES_DATABASE must be set")?,
            host: env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("POSTGRES_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5432),
            ssl_mode: env::var("POSTGRES_SSL_MODE").unwrap_or_else(|_| "disable".to_string()),
            option: env::var("POSTGRES_OPTION").ok().filter(|v| !v.is_empty()),
        })
    }

    /// Assemble the DSN. User and password are percent-encoded so reserved
    /// characters such as `@`, `/` and `:` survive.
    pub fn to_url(&self) -> Result<String> {
        let base = format!("postgres://{}:{}/{}", self.host, self.port, self.database);
        let mut url = Url::parse(&base).context("Invalid POSTGRES_HOST or POSTGRES_DATABASE")?;
        url.set_username(&self.user)
            .map_err(|_| anyhow!("Cannot set user on {}", base))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| anyhow!("Cannot set password on {}", base))?;
        }

        let mut query = format!("sslmode={}", self.ssl_mode);
        if let Some(option) = &self.option {
            query.push('&');
            query.push_str(option);
        }
        url.set_query(Some(&query));
        Ok(url.into())
    }
}

/// `DATABASE_URL` if set, otherwise a URL built from `POSTGRES_*`.
pub fn database_url_from_env() -> Result<String> {
    match env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => Ok(url),
        _ => PgUrlParts::from_env()
            .and_then(|parts| parts.to_url())
            .context("Set DATABASE_URL or the POSTGRES_* connection variables"),
    }
}

pub async fn create_pool(database_url: &str, config: &DbPoolConfig) -> Result<PgPool> {
    info!(
        "Creating database pool: max={}, min={}, acquire_timeout={}s",
        config.max_connections,
        config.min_connections,
        config.acquire_timeout.as_secs()
    );

    let connect_opts =
        PgConnectOptions::from_str(database_url).context("Failed to parse database URL")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_opts)
        .await
        .context("Failed to create database pool")?;

    info!("Database pool created");
    Ok(pool)
}
