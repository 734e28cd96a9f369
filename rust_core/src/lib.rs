//! Miniscore Core - shared building blocks for the live scoreboard services.
//!
//! This crate provides:
//! - Data model for games, teams, quarter scores and scraped ESPN records
//! - Game-week window arithmetic (Tuesday through Monday)
//! - Embedded-JSON extraction and schedule/game page decoding
//! - HTTP transport to ESPN with bounded retry
//! - `EventStore` persistence contract with Postgres and in-memory backends
//! - Last-written-value caches for score and clock updates
//! - The persisted scoreboard read query

pub mod cache;
pub mod clients;
pub mod db;
pub mod error;
pub mod models;
pub mod scoreboard;
pub mod scrape;
pub mod week_window;

pub use cache::UpdateCache;
pub use clients::{EspnClient, EspnClientConfig, EspnTransport};
pub use db::{EventStore, MemoryEventStore, PgEventStore};
pub use error::{FetchError, ScrapeError, StoreError, SyncError};
pub use scoreboard::{GameScore, Scoreboard, TeamLine};
pub use scrape::{EspnPageDecoder, ScheduleDecoder};
pub use week_window::WeekWindow;
