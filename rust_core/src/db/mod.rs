//! Persistence boundary for games, teams and quarter scores.
//!
//! `EventStore` is the only way the scheduler touches storage. The Postgres
//! implementation backs the service; the in-memory one backs tests.

use crate::error::StoreError;
use crate::models::{Game, GameSummary, QuarterScore, Team};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;
pub mod pool;
pub mod postgres;
pub mod retry;
pub mod schema;

pub use memory::{MemoryEventStore, WriteCounts};
pub use pool::{create_pool, database_url_from_env, DbPoolConfig};
pub use postgres::PgEventStore;

/// CRUD contract over the `game`, `team` and `game_quarter_score` tables.
///
/// Lookups return `StoreError::NotFound` for a missing row; callers branch
/// on that to choose between insert and update. Soft-deleted rows are
/// invisible to reads.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_game(&self, id: &str) -> Result<Game, StoreError>;

    async fn insert_game(&self, game: &Game) -> Result<(), StoreError>;

    async fn update_game_time(&self, id: &str, game_time: DateTime<Utc>)
        -> Result<(), StoreError>;

    /// Games with `start <= game_time <= end`.
    async fn get_games_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Game>, StoreError>;

    async fn get_team_by_abbrev(&self, abbrev: &str) -> Result<Team, StoreError>;

    async fn get_quarter_score(
        &self,
        game_id: &str,
        team_abbrev: &str,
        quarter: &str,
    ) -> Result<QuarterScore, StoreError>;

    /// Insert a score row; the team is resolved from `team_abbrev`.
    async fn insert_quarter_score(&self, score: &QuarterScore) -> Result<(), StoreError>;

    /// Overwrite the score of the existing `(game, team, quarter)` row.
    async fn update_quarter_score(&self, score: &QuarterScore) -> Result<(), StoreError>;

    async fn update_quarter_and_clock(
        &self,
        game_id: &str,
        quarter: &str,
        clock: &str,
    ) -> Result<(), StoreError>;

    /// Games in the window joined with their teams' abbreviations.
    async fn get_games_with_team_abbrev(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<GameSummary>, StoreError>;

    /// Every quarter score of every game in the window.
    async fn get_team_quarter_scores(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QuarterScore>, StoreError>;
}
