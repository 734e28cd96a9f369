//! In-process `EventStore` with write accounting.
//!
//! Mirrors the Postgres semantics the scheduler depends on: quarter-score
//! rows need a known team, duplicates are rejected, updates of missing rows
//! report `NotFound`, soft-deleted games are invisible. Every successful
//! write is counted so callers can assert how many round trips a code path
//! made.

use super::EventStore;
use crate::error::StoreError;
use crate::models::{Game, GameSummary, QuarterScore, Team};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

type ScoreRowKey = (String, String, String);

#[derive(Debug, Default)]
struct Tables {
    games: FxHashMap<String, Game>,
    /// Keyed by abbreviation
    teams: FxHashMap<String, Team>,
    scores: FxHashMap<ScoreRowKey, i32>,
}

/// Successful writes by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub game_inserts: usize,
    pub game_time_updates: usize,
    pub score_inserts: usize,
    pub score_updates: usize,
    pub clock_updates: usize,
}

impl WriteCounts {
    pub fn total(&self) -> usize {
        self.game_inserts
            + self.game_time_updates
            + self.score_inserts
            + self.score_updates
            + self.clock_updates
    }

    pub fn score_writes(&self) -> usize {
        self.score_inserts + self.score_updates
    }
}

#[derive(Debug, Default)]
struct Counters {
    game_inserts: AtomicUsize,
    game_time_updates: AtomicUsize,
    score_inserts: AtomicUsize,
    score_updates: AtomicUsize,
    clock_updates: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct MemoryEventStore {
    tables: RwLock<Tables>,
    counters: Counters,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

fn injected(op: &str) -> StoreError {
    StoreError::Database(sqlx::Error::Protocol(format!("injected {} failure", op)))
}

fn conflict(what: &str) -> StoreError {
    StoreError::Database(sqlx::Error::Protocol(format!(
        "duplicate key value violates unique constraint on {}",
        what
    )))
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_team(&self, name: &str, abbreviation: &str) -> Team {
        let team = Team::new(name, abbreviation);
        self.tables
            .write()
            .teams
            .insert(abbreviation.to_string(), team.clone());
        team
    }

    /// Insert a game row without counting it as a write.
    pub fn seed_game(&self, game: Game) {
        self.tables.write().games.insert(game.id.clone(), game);
    }

    pub fn soft_delete_game(&self, id: &str) {
        if let Some(game) = self.tables.write().games.get_mut(id) {
            game.deleted_at = Some(Utc::now());
        }
    }

    /// Raw row, including soft-deleted games.
    pub fn game(&self, id: &str) -> Option<Game> {
        self.tables.read().games.get(id).cloned()
    }

    /// All score rows of one game, ordered by team then quarter.
    pub fn scores_for(&self, game_id: &str) -> Vec<QuarterScore> {
        let tables = self.tables.read();
        let mut scores: Vec<QuarterScore> = tables
            .scores
            .iter()
            .filter(|((gid, _, _), _)| gid == game_id)
            .map(|((gid, abbrev, quarter), score)| QuarterScore::new(gid, abbrev, quarter, *score))
            .collect();
        scores.sort_by(|a, b| {
            (&a.team_abbrev, &a.quarter).cmp(&(&b.team_abbrev, &b.quarter))
        });
        scores
    }

    pub fn writes(&self) -> WriteCounts {
        WriteCounts {
            game_inserts: self.counters.game_inserts.load(Ordering::SeqCst),
            game_time_updates: self.counters.game_time_updates.load(Ordering::SeqCst),
            score_inserts: self.counters.score_inserts.load(Ordering::SeqCst),
            score_updates: self.counters.score_updates.load(Ordering::SeqCst),
            clock_updates: self.counters.clock_updates.load(Ordering::SeqCst),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        Ok(())
    }

    fn live_games_in(
        tables: &Tables,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Game> {
        let mut games: Vec<Game> = tables
            .games
            .values()
            .filter(|g| g.deleted_at.is_none() && g.game_time >= start && g.game_time <= end)
            .cloned()
            .collect();
        games.sort_by(|a, b| (a.game_time, &a.id).cmp(&(b.game_time, &b.id)));
        games
    }
}

fn abbrev_for(tables: &Tables, team_id: uuid::Uuid) -> Option<String> {
    tables
        .teams
        .values()
        .find(|t| t.id == team_id && t.deleted_at.is_none())
        .map(|t| t.abbreviation.clone())
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn get_game(&self, id: &str) -> Result<Game, StoreError> {
        self.check_read()?;
        self.tables
            .read()
            .games
            .get(id)
            .filter(|g| g.deleted_at.is_none())
            .cloned()
            .ok_or(StoreError::NotFound("game"))
    }

    async fn insert_game(&self, game: &Game) -> Result<(), StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write();
        if tables.games.contains_key(&game.id) {
            return Err(conflict("game.id"));
        }
        tables.games.insert(game.id.clone(), game.clone());
        self.counters.game_inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_game_time(
        &self,
        id: &str,
        game_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write();
        let game = tables
            .games
            .get_mut(id)
            .filter(|g| g.deleted_at.is_none())
            .ok_or(StoreError::NotFound("game"))?;
        game.game_time = game_time;
        game.updated_at = Utc::now();
        self.counters.game_time_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_games_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Game>, StoreError> {
        self.check_read()?;
        Ok(Self::live_games_in(&self.tables.read(), start, end))
    }

    async fn get_team_by_abbrev(&self, abbrev: &str) -> Result<Team, StoreError> {
        self.check_read()?;
        self.tables
            .read()
            .teams
            .get(abbrev)
            .filter(|t| t.deleted_at.is_none())
            .cloned()
            .ok_or(StoreError::NotFound("team"))
    }

    async fn get_quarter_score(
        &self,
        game_id: &str,
        team_abbrev: &str,
        quarter: &str,
    ) -> Result<QuarterScore, StoreError> {
        self.check_read()?;
        let key = (game_id.to_string(), team_abbrev.to_string(), quarter.to_string());
        self.tables
            .read()
            .scores
            .get(&key)
            .map(|score| QuarterScore::new(game_id, team_abbrev, quarter, *score))
            .ok_or(StoreError::NotFound("quarter score"))
    }

    async fn insert_quarter_score(&self, score: &QuarterScore) -> Result<(), StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write();
        if !tables.teams.contains_key(&score.team_abbrev) {
            // team_id sub-select yields NULL
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "null value in column team_id: unknown team {}",
                score.team_abbrev
            ))));
        }
        let key = (
            score.game_id.clone(),
            score.team_abbrev.clone(),
            score.quarter.clone(),
        );
        if tables.scores.contains_key(&key) {
            return Err(conflict("game_quarter_score(game_id, team_id, quarter)"));
        }
        tables.scores.insert(key, score.score);
        self.counters.score_inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_quarter_score(&self, score: &QuarterScore) -> Result<(), StoreError> {
        self.check_write()?;
        let key = (
            score.game_id.clone(),
            score.team_abbrev.clone(),
            score.quarter.clone(),
        );
        let mut tables = self.tables.write();
        let row = tables
            .scores
            .get_mut(&key)
            .ok_or(StoreError::NotFound("quarter score"))?;
        *row = score.score;
        self.counters.score_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_quarter_and_clock(
        &self,
        game_id: &str,
        quarter: &str,
        clock: &str,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write();
        let game = tables
            .games
            .get_mut(game_id)
            .filter(|g| g.deleted_at.is_none())
            .ok_or(StoreError::NotFound("game"))?;
        game.quarter = quarter.to_string();
        game.game_clock = clock.to_string();
        game.updated_at = Utc::now();
        self.counters.clock_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_games_with_team_abbrev(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<GameSummary>, StoreError> {
        self.check_read()?;
        let tables = self.tables.read();
        let summaries = Self::live_games_in(&tables, start, end)
            .into_iter()
            .filter_map(|game| {
                Some(GameSummary {
                    away_team: abbrev_for(&tables, game.away_team)?,
                    home_team: abbrev_for(&tables, game.home_team)?,
                    id: game.id,
                    game_time: game.game_time,
                    game_clock: game.game_clock,
                    quarter: game.quarter,
                })
            })
            .collect();
        Ok(summaries)
    }

    async fn get_team_quarter_scores(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QuarterScore>, StoreError> {
        self.check_read()?;
        let games = Self::live_games_in(&self.tables.read(), start, end);
        Ok(games
            .iter()
            .flat_map(|game| self.scores_for(&game.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 9, 10, 13, 0, 0).unwrap()
    }

    fn store_with_game() -> (MemoryEventStore, Game) {
        let store = MemoryEventStore::new();
        let sf = store.add_team("San Francisco 49ers", "SF");
        let pit = store.add_team("Pittsburgh Steelers", "PIT");
        let game = Game::scheduled("12345", kickoff(), sf.id, pit.id);
        store.seed_game(game.clone());
        (store, game)
    }

    #[tokio::test]
    async fn test_get_game_and_not_found() {
        let (store, game) = store_with_game();
        assert_eq!(store.get_game("12345").await.unwrap().id, game.id);
        assert!(store.get_game("nope").await.unwrap_err().is_not_found());

        store.soft_delete_game("12345");
        assert!(store.get_game("12345").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_quarter_score_insert_update() {
        let (store, _) = store_with_game();
        let score = QuarterScore::new("12345", "SF", "1", 0);

        assert!(store
            .update_quarter_score(&score)
            .await
            .unwrap_err()
            .is_not_found());
        store.insert_quarter_score(&score).await.unwrap();
        assert!(store.insert_quarter_score(&score).await.is_err());

        store
            .update_quarter_score(&QuarterScore::new("12345", "SF", "1", 7))
            .await
            .unwrap();
        assert_eq!(
            store.get_quarter_score("12345", "SF", "1").await.unwrap().score,
            7
        );
        assert_eq!(
            store.writes(),
            WriteCounts {
                score_inserts: 1,
                score_updates: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_team_rejected() {
        let (store, _) = store_with_game();
        let err = store
            .insert_quarter_score(&QuarterScore::new("12345", "XXX", "1", 0))
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_window_reads_join_abbreviations() {
        let (store, _) = store_with_game();
        store
            .insert_quarter_score(&QuarterScore::new("12345", "PIT", "1", 3))
            .await
            .unwrap();

        let start = kickoff() - chrono::Duration::days(1);
        let end = kickoff() + chrono::Duration::days(1);

        let summaries = store.get_games_with_team_abbrev(start, end).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].away_team, "SF");
        assert_eq!(summaries[0].home_team, "PIT");

        let scores = store.get_team_quarter_scores(start, end).await.unwrap();
        assert_eq!(scores, vec![QuarterScore::new("12345", "PIT", "1", 3)]);

        let later = store
            .get_games_in_window(end, end + chrono::Duration::days(7))
            .await
            .unwrap();
        assert!(later.is_empty());
    }

    #[tokio::test]
    async fn test_injected_write_failure_is_not_counted() {
        let (store, _) = store_with_game();
        store.set_fail_writes(true);
        assert!(store
            .update_quarter_and_clock("12345", "1", "15:00")
            .await
            .is_err());
        assert_eq!(store.writes().total(), 0);

        store.set_fail_writes(false);
        store
            .update_quarter_and_clock("12345", "1", "15:00")
            .await
            .unwrap();
        assert_eq!(store.writes().clock_updates, 1);
        assert_eq!(store.game("12345").unwrap().game_clock, "15:00");
    }
}
