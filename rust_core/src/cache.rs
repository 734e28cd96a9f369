//! Last-written-value caches that suppress redundant store writes.
//!
//! Callers check `is_*_current` first, write to the store on a miss, and
//! call `record_*` only after that write succeeded. An entry therefore never
//! claims a value the store does not hold; losing entries only costs an
//! extra write.

use crate::models::QuarterScore;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Composite key for one team's score in one quarter of one game.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScoreKey {
    pub game_id: String,
    pub team_abbrev: String,
    pub quarter: String,
}

impl From<&QuarterScore> for ScoreKey {
    fn from(score: &QuarterScore) -> Self {
        Self {
            game_id: score.game_id.clone(),
            team_abbrev: score.team_abbrev.clone(),
            quarter: score.quarter.clone(),
        }
    }
}

/// Quarter-score and clock dedupe maps, each behind its own lock.
///
/// Locks are only held for the map operation itself.
#[derive(Debug, Default)]
pub struct UpdateCache {
    scores: RwLock<FxHashMap<ScoreKey, i32>>,
    clocks: RwLock<FxHashMap<String, String>>,
}

impl UpdateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `score` is exactly what was last persisted for its key.
    pub fn is_score_current(&self, score: &QuarterScore) -> bool {
        self.scores
            .read()
            .get(&ScoreKey::from(score))
            .is_some_and(|cached| *cached == score.score)
    }

    pub fn record_score(&self, score: &QuarterScore) {
        self.scores.write().insert(ScoreKey::from(score), score.score);
    }

    pub fn cached_score(&self, key: &ScoreKey) -> Option<i32> {
        self.scores.read().get(key).copied()
    }

    pub fn is_clock_current(&self, game_id: &str, clock: &str) -> bool {
        self.clocks
            .read()
            .get(game_id)
            .is_some_and(|cached| cached == clock)
    }

    pub fn record_clock(&self, game_id: &str, clock: &str) {
        self.clocks.write().insert(game_id.to_string(), clock.to_string());
    }

    pub fn cached_clock(&self, game_id: &str) -> Option<String> {
        self.clocks.read().get(game_id).cloned()
    }

    /// Drop every score and clock entry for `game_id`.
    pub fn clear_game(&self, game_id: &str) {
        self.scores.write().retain(|key, _| key.game_id != game_id);
        self.clocks.write().remove(game_id);
    }

    pub fn score_entries(&self) -> usize {
        self.scores.read().len()
    }

    pub fn clock_entries(&self) -> usize {
        self.clocks.read().len()
    }
}
