//! Payloads scraped from the ESPN schedule, game and scoreboard pages.
//!
//! Only the fields the scheduler reads are modelled; everything else in the
//! embedded JSON is ignored by serde.

use crate::error::ScrapeError;
use crate::models::QuarterScore;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Number of schedule weeks that make up one season (pre + regular + post).
///
/// The schedule page lists more than one season; only the trailing
/// `SEASON_WEEK_COUNT` entries are kept.
pub const SEASON_WEEK_COUNT: usize = 27;

/// Minute-precision UTC timestamps used throughout the scraped payloads
const ESPN_MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// Parse an ESPN `2023-09-10T13:00Z` timestamp.
pub fn parse_espn_minute(value: &str) -> Result<DateTime<Utc>, ScrapeError> {
    NaiveDateTime::parse_from_str(value, ESPN_MINUTE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| ScrapeError::BadTimestamp {
            value: value.to_string(),
            source,
        })
}

fn espn_minute<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_espn_minute(&raw).map_err(serde::de::Error::custom)
}

// ============================================================================
// Schedule weeks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SeasonType {
    Pre = 1,
    Reg = 2,
    Post = 3,
}

impl TryFrom<u8> for SeasonType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SeasonType::Pre),
            2 => Ok(SeasonType::Reg),
            3 => Ok(SeasonType::Post),
            other => Err(format!("unknown season type {}", other)),
        }
    }
}

impl From<SeasonType> for u8 {
    fn from(value: SeasonType) -> Self {
        value as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub label: String,
    #[serde(deserialize_with = "espn_minute")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "espn_minute")]
    pub end_date: DateTime<Utc>,
    pub season_type: SeasonType,
    pub week_number: u32,
    pub year: i32,
    /// Path (relative to the site root) of the week's schedule page
    pub url: String,
    #[serde(default)]
    pub is_active: bool,
}

impl Week {
    /// Ordering key: year, then season type, then week number.
    pub fn season_key(&self) -> (i32, SeasonType, u32) {
        (self.year, self.season_type, self.week_number)
    }
}

/// Keep the trailing season's worth of weeks and sort them ascending.
pub fn latest_season(mut weeks: Vec<Week>) -> Vec<Week> {
    if weeks.len() > SEASON_WEEK_COUNT {
        weeks.drain(..weeks.len() - SEASON_WEEK_COUNT);
    }
    weeks.sort_by_key(Week::season_key);
    weeks
}

// ============================================================================
// Week games
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    #[serde(default)]
    pub id: String,
    pub abbrev: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_home: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedGame {
    pub id: String,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
    pub date: String,
    #[serde(default)]
    pub tbd: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub is_tie: bool,
    #[serde(default)]
    pub time_valid: bool,
}

impl ScrapedGame {
    pub fn kickoff(&self) -> Result<DateTime<Utc>, ScrapeError> {
        parse_espn_minute(&self.date)
    }

    /// `(away, home)` competitors.
    ///
    /// The first competitor is the away side unless it carries the home flag.
    pub fn away_home(&self) -> Result<(&Competitor, &Competitor), ScrapeError> {
        match self.competitors.as_slice() {
            [first, second, ..] if first.is_home => Ok((second, first)),
            [first, second, ..] => Ok((first, second)),
            _ => Err(ScrapeError::NotEnoughTeams {
                game_id: self.id.clone(),
                found: self.competitors.len(),
            }),
        }
    }
}

/// Scraped games keyed by the schedule page's date heading (`20230910`).
pub type GamesByDate = BTreeMap<String, Vec<ScrapedGame>>;

// ============================================================================
// Game detail strip
// ============================================================================

/// Where an event is in its lifecycle, derived from the status description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Scheduled,
    InProgress,
    Final,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    /// Human status description, e.g. "Scheduled", "Final", "In Progress"
    #[serde(default)]
    pub desc: String,
    /// Detail text; for scheduled games this is the kickoff, "9/10 - 1:00 PM EDT"
    #[serde(default)]
    pub det: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineScore {
    #[serde(default)]
    pub display_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStrip {
    #[serde(default)]
    pub abbrev: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_home: bool,
    #[serde(default)]
    pub linescores: Vec<LineScore>,
    #[serde(default)]
    pub score: String,
    #[serde(default)]
    pub winner: bool,
}

/// Live detail for one event, taken from the game page's summary strip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    #[serde(rename = "gid", default)]
    pub game_id: String,
    #[serde(default)]
    pub season_type: u8,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub status_state: String,
    #[serde(default)]
    pub tbd: bool,
    #[serde(rename = "tms", default)]
    pub teams: Vec<TeamStrip>,
}

impl GameInfo {
    pub fn phase(&self) -> EventPhase {
        match self.status.desc.as_str() {
            "Final" => EventPhase::Final,
            "Scheduled" => EventPhase::Scheduled,
            _ => EventPhase::InProgress,
        }
    }

    /// Per-team, per-quarter scores from the first two teams' line scores.
    ///
    /// Quarter labels are 1-based positions in the line-score list; values that
    /// do not parse as integers count as zero.
    pub fn quarter_scores(&self) -> Result<Vec<QuarterScore>, ScrapeError> {
        if self.teams.len() < 2 {
            return Err(ScrapeError::NotEnoughTeams {
                game_id: self.game_id.clone(),
                found: self.teams.len(),
            });
        }

        let scores = self.teams[..2]
            .iter()
            .flat_map(|team| {
                team.linescores.iter().enumerate().map(move |(i, line)| {
                    QuarterScore::new(
                        self.game_id.clone(),
                        team.abbrev.clone(),
                        (i + 1).to_string(),
                        line.display_value.trim().parse().unwrap_or(0),
                    )
                })
            })
            .collect();

        Ok(scores)
    }
}

// ============================================================================
// Live scoreboard feed
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardStatus {
    #[serde(default)]
    pub period: i32,
    #[serde(default)]
    pub display_clock: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreboardEvent {
    /// Composite id, e.g. `s:20~l:28~e:401547353`
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub status: ScoreboardStatus,
}

impl ScoreboardEvent {
    /// The event id: everything after the final `:` of the uid.
    pub fn event_id(&self) -> &str {
        match self.uid.rfind(':') {
            Some(idx) => &self.uid[idx + 1..],
            None => &self.uid,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SbData {
    #[serde(default)]
    events: Vec<ScoreboardEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ScoreboardContent {
    #[serde(rename = "sbData", default)]
    sb_data: SbData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreboardResponse {
    #[serde(default)]
    content: ScoreboardContent,
}

impl ScoreboardResponse {
    pub fn events(&self) -> &[ScoreboardEvent] {
        &self.content.sb_data.events
    }

    /// `(display clock, period)` for the event whose uid ends in `game_id`.
    pub fn clock_for(&self, game_id: &str) -> Option<(String, String)> {
        self.events()
            .iter()
            .find(|event| !event.uid.is_empty() && event.event_id() == game_id)
            .map(|event| {
                (
                    event.status.display_clock.clone(),
                    event.status.period.to_string(),
                )
            })
    }
}
