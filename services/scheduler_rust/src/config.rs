//! Configuration and environment loading for the scheduler service
//!
//! - Schedule sync cadence
//! - ESPN endpoints and fetch retry policy
//! - Monitor polling cadence and kickoff lookahead
//! - Database connection parameters

use anyhow::Result;
use miniscore_core::clients::espn::{DEFAULT_SCOREBOARD_URL, DEFAULT_SITE_URL};
use miniscore_core::db::retry::DEFAULT_MAX_ATTEMPTS as DEFAULT_DB_MAX_ATTEMPTS;
use miniscore_core::db::{database_url_from_env, DbPoolConfig};
use miniscore_core::EspnClientConfig;
use std::env;
use std::time::Duration;

/// Default schedule re-sync interval (24h)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 86_400;

/// Default delay between polls of a live game
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Monitors wake this long before the listed kickoff
pub const DEFAULT_KICKOFF_LOOKAHEAD_HOURS: i64 = 4;

pub const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;

/// Capacity of the feed -> scheduler hand-off queue
pub const DEFAULT_FEED_QUEUE_SIZE: usize = 64;

/// Per-game polling behaviour.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub kickoff_lookahead: chrono::Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            kickoff_lookahead: chrono::Duration::hours(DEFAULT_KICKOFF_LOOKAHEAD_HOURS),
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        let poll_interval_ms = env::var("MONITOR_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
            .max(100);

        let lookahead_hours = env::var("KICKOFF_LOOKAHEAD_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_KICKOFF_LOOKAHEAD_HOURS);

        Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            kickoff_lookahead: chrono::Duration::hours(lookahead_hours),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub pool: DbPoolConfig,
    /// Attempts per database call before a transient error is returned
    pub db_max_attempts: u32,
    pub apply_schema: bool,
    pub sync_interval: Duration,
    pub feed_queue_size: usize,
    pub espn: EspnClientConfig,
    pub monitor: MonitorConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let sync_interval = Duration::from_secs(
            env::var("SCHEDULE_SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS),
        );

        let espn = EspnClientConfig {
            site_url: env::var("ESPN_SITE_URL").unwrap_or_else(|_| DEFAULT_SITE_URL.to_string()),
            scoreboard_url: env::var("ESPN_SCOREBOARD_URL")
                .unwrap_or_else(|_| DEFAULT_SCOREBOARD_URL.to_string()),
            max_attempts: env::var("FETCH_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_FETCH_MAX_ATTEMPTS),
            ..Default::default()
        };

        Ok(Self {
            database_url: database_url_from_env()?,
            pool: DbPoolConfig::from_env(),
            db_max_attempts: env::var("DB_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_ATTEMPTS),
            apply_schema: env::var("APPLY_SCHEMA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            sync_interval,
            feed_queue_size: env::var("FEED_QUEUE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_FEED_QUEUE_SIZE)
                .max(1),
            espn,
            monitor: MonitorConfig::from_env(),
        })
    }
}
