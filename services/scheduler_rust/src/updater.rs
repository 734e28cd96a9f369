//! Score and clock persistence for live games.
//!
//! Every write goes through the `UpdateCache`: a value equal to the cached
//! one is skipped, anything else is written to the store first and cached
//! only once the write succeeded.

use miniscore_core::models::{GameInfo, QuarterScore, FINAL_CLOCK, FINAL_QUARTER};
use miniscore_core::{
    EspnTransport, EventStore, ScheduleDecoder, StoreError, SyncError, UpdateCache,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of one attempted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Cache already held this value; the store was not touched
    Skipped,
    Written,
}

/// Tally of a quarter-score pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScorePass {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct GameUpdater {
    store: Arc<dyn EventStore>,
    transport: Arc<dyn EspnTransport>,
    decoder: Arc<dyn ScheduleDecoder>,
    cache: Arc<UpdateCache>,
}

impl GameUpdater {
    pub fn new(
        store: Arc<dyn EventStore>,
        transport: Arc<dyn EspnTransport>,
        decoder: Arc<dyn ScheduleDecoder>,
        cache: Arc<UpdateCache>,
    ) -> Self {
        Self {
            store,
            transport,
            decoder,
            cache,
        }
    }

    pub fn cache(&self) -> &UpdateCache {
        &self.cache
    }

    /// Persist one quarter score unless the cache says it is already stored.
    ///
    /// A missing row is inserted, an existing one updated.
    pub async fn write_quarter_score(
        &self,
        score: &QuarterScore,
    ) -> Result<WriteOutcome, StoreError> {
        if self.cache.is_score_current(score) {
            debug!(
                game_id = %score.game_id,
                team = %score.team_abbrev,
                quarter = %score.quarter,
                "Score cache is current, skipping"
            );
            return Ok(WriteOutcome::Skipped);
        }

        match self
            .store
            .get_quarter_score(&score.game_id, &score.team_abbrev, &score.quarter)
            .await
        {
            Ok(_) => self.store.update_quarter_score(score).await?,
            Err(e) if e.is_not_found() => self.store.insert_quarter_score(score).await?,
            Err(e) => return Err(e),
        }

        self.cache.record_score(score);
        Ok(WriteOutcome::Written)
    }

    /// Write every line score in `info`. Individual failures are logged and
    /// leave their cache entry untouched so the next poll retries them.
    pub async fn update_quarter_scores(&self, info: &GameInfo) -> Result<ScorePass, SyncError> {
        let scores = info.quarter_scores()?;
        let mut pass = ScorePass::default();

        for score in &scores {
            match self.write_quarter_score(score).await {
                Ok(WriteOutcome::Written) => pass.written += 1,
                Ok(WriteOutcome::Skipped) => pass.skipped += 1,
                Err(e) => {
                    pass.failed += 1;
                    error!(
                        game_id = %score.game_id,
                        team = %score.team_abbrev,
                        quarter = %score.quarter,
                        "Failed to write quarter score: {}",
                        e
                    );
                }
            }
        }

        if pass.written > 0 {
            info!(
                game_id = %info.game_id,
                "Quarter scores: {} written, {} unchanged, {} failed",
                pass.written, pass.skipped, pass.failed
            );
        }
        Ok(pass)
    }

    /// Persist a clock reading unless it matches the cached one.
    pub async fn write_clock(
        &self,
        game_id: &str,
        quarter: &str,
        clock: &str,
    ) -> Result<WriteOutcome, StoreError> {
        if self.cache.is_clock_current(game_id, clock) {
            debug!(game_id = %game_id, clock = %clock, "Clock cache is current, skipping");
            return Ok(WriteOutcome::Skipped);
        }

        self.store
            .update_quarter_and_clock(game_id, quarter, clock)
            .await?;
        self.cache.record_clock(game_id, clock);
        Ok(WriteOutcome::Written)
    }

    /// Look the game up on the live scoreboard and persist its clock and period.
    pub async fn update_clock(&self, game_id: &str) -> Result<WriteOutcome, SyncError> {
        let body = self.transport.fetch_live_scoreboard_json().await?;
        let board = self.decoder.decode_scoreboard(&body)?;
        let (clock, period) = board
            .clock_for(game_id)
            .ok_or_else(|| SyncError::NotOnScoreboard(game_id.to_string()))?;

        Ok(self.write_clock(game_id, &period, &clock).await?)
    }

    /// One in-progress observation: scores and clock, concurrently. Both
    /// finish before this returns so a monitor's observations never overlap.
    pub async fn update_game(&self, info: &GameInfo) {
        let (scores, clock) = tokio::join!(
            self.update_quarter_scores(info),
            self.update_clock(&info.game_id)
        );

        if let Err(e) = scores {
            warn!(game_id = %info.game_id, "Quarter score update failed: {}", e);
        }
        if let Err(e) = clock {
            warn!(game_id = %info.game_id, "Clock update failed: {}", e);
        }
    }

    /// Terminal write: last line scores plus the `F` / `Final` marker, then
    /// drop the game's cache entries.
    pub async fn finalize(&self, info: &GameInfo) {
        let (scores, marker) = tokio::join!(
            self.update_quarter_scores(info),
            self.store
                .update_quarter_and_clock(&info.game_id, FINAL_QUARTER, FINAL_CLOCK)
        );

        if let Err(e) = scores {
            warn!(game_id = %info.game_id, "Final quarter scores failed: {}", e);
        }
        match marker {
            Ok(()) => info!(game_id = %info.game_id, "Game finalized"),
            Err(e) => error!(game_id = %info.game_id, "Failed to write final marker: {}", e),
        }

        self.cache.clear_game(&info.game_id);
    }
}
