// Shared models for the miniscore services
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod espn;

pub use espn::{
    latest_season, parse_espn_minute, Competitor, EventPhase, GameInfo, GameStatus, GamesByDate,
    LineScore, ScoreboardEvent, ScoreboardResponse, ScrapedGame, SeasonType, TeamStrip, Week,
    SEASON_WEEK_COUNT,
};

/// Quarter label written when a game reaches its terminal state
pub const FINAL_QUARTER: &str = "F";
/// Clock text written when a game reaches its terminal state
pub const FINAL_CLOCK: &str = "Final";
/// Regulation quarters seeded with zero scores for every team
pub const REGULATION_QUARTERS: usize = 4;

// ============================================================================
// Persisted rows
// ============================================================================

/// One scheduled contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Game {
    pub id: String,
    pub game_time: DateTime<Utc>,
    pub quarter: String,
    pub game_clock: String,
    pub away_team: Uuid,
    pub home_team: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Game {
    /// A game that has not started: empty quarter and clock.
    pub fn scheduled(
        id: impl Into<String>,
        game_time: DateTime<Utc>,
        away_team: Uuid,
        home_team: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            game_time,
            quarter: String::new(),
            game_clock: String::new(),
            away_team,
            home_team,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    /// Stable join key for scraped data, which only carries abbreviations
    pub abbreviation: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Team {
    pub fn new(name: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            abbreviation: abbreviation.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Score for one team in one quarter of one game.
///
/// The team is addressed by abbreviation; the store resolves it to the
/// team row on write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuarterScore {
    pub game_id: String,
    pub team_abbrev: String,
    pub quarter: String,
    pub score: i32,
}

impl QuarterScore {
    pub fn new(
        game_id: impl Into<String>,
        team_abbrev: impl Into<String>,
        quarter: impl Into<String>,
        score: i32,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            team_abbrev: team_abbrev.into(),
            quarter: quarter.into(),
            score,
        }
    }
}

/// Game joined with its teams' abbreviations, for scoreboard reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GameSummary {
    pub id: String,
    pub away_team: String,
    pub home_team: String,
    pub game_time: DateTime<Utc>,
    pub game_clock: String,
    pub quarter: String,
}
