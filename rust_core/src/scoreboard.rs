//! Read side: the persisted scoreboard for one game week.
//!
//! Everything here comes from the store, never from in-memory monitor state,
//! so a reader sees exactly what has been written so far.

use crate::db::EventStore;
use crate::models::{GameSummary, QuarterScore};
use crate::week_window::WeekWindow;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{error, info};

/// Clock shown for games that have not started.
const KICKOFF_FORMAT: &str = "%a, %-I:%M %p";

/// One team's per-quarter scores, in quarter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamLine {
    pub abbrev: String,
    pub scores: Vec<i32>,
}

impl TeamLine {
    pub fn total(&self) -> i32 {
        self.scores.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameScore {
    pub game_id: String,
    pub away: TeamLine,
    pub home: TeamLine,
    pub quarter: String,
    pub clock: String,
    pub kickoff: DateTime<Utc>,
}

pub struct Scoreboard;

impl Scoreboard {
    /// Games of the week containing `date`, in host local time.
    pub async fn for_date(store: &dyn EventStore, date: DateTime<Utc>) -> Vec<GameScore> {
        Self::for_date_in(store, date, &chrono::Local).await
    }

    /// Games of the week containing `date` in `tz`, ordered by kickoff then
    /// id. A failed read yields an empty section rather than an error.
    pub async fn for_date_in<Tz: TimeZone>(
        store: &dyn EventStore,
        date: DateTime<Utc>,
        tz: &Tz,
    ) -> Vec<GameScore>
    where
        Tz::Offset: std::fmt::Display,
    {
        let window = WeekWindow::containing_in(date, tz);
        info!("Reading scoreboard {} .. {}", window.start, window.end);

        let scores = store
            .get_team_quarter_scores(window.start, window.end)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to read quarter scores: {}", e);
                Vec::new()
            });

        let games = store
            .get_games_with_team_abbrev(window.start, window.end)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to read games: {}", e);
                Vec::new()
            });

        assemble(games, &scores, tz)
    }
}

fn assemble<Tz: TimeZone>(
    games: Vec<GameSummary>,
    scores: &[QuarterScore],
    tz: &Tz,
) -> Vec<GameScore>
where
    Tz::Offset: std::fmt::Display,
{
    let mut board: Vec<GameScore> = games
        .into_iter()
        .map(|game| {
            let clock = if game.game_clock.is_empty() {
                game.game_time
                    .with_timezone(tz)
                    .format(KICKOFF_FORMAT)
                    .to_string()
            } else {
                game.game_clock
            };
            GameScore {
                away: team_line(&game.id, &game.away_team, scores),
                home: team_line(&game.id, &game.home_team, scores),
                game_id: game.id,
                quarter: game.quarter,
                clock,
                kickoff: game.game_time,
            }
        })
        .collect();

    board.sort_by(|a, b| (a.kickoff, &a.game_id).cmp(&(b.kickoff, &b.game_id)));
    board
}

fn team_line(game_id: &str, abbrev: &str, scores: &[QuarterScore]) -> TeamLine {
    let mut quarters: Vec<&QuarterScore> = scores
        .iter()
        .filter(|s| s.game_id == game_id && s.team_abbrev == abbrev)
        .collect();
    // Numeric labels first, in numeric order; anything else after
    quarters.sort_by_key(|s| (s.quarter.parse::<u32>().unwrap_or(u32::MAX), s.quarter.clone()));

    TeamLine {
        abbrev: abbrev.to_string(),
        scores: quarters.into_iter().map(|s| s.score).collect(),
    }
}
