//! Schedule reconciliation: scraped season schedule -> `game` rows.
//!
//! A pass fetches the season's weeks, then every week's games, and
//! inserts or reschedules each game. A failure to get the week list or any
//! week page aborts the pass; a failure on one game is logged and the pass
//! moves on.

use chrono::{DateTime, Utc};
use miniscore_core::models::{Game, GamesByDate, QuarterScore, ScrapedGame, REGULATION_QUARTERS};
use miniscore_core::{EspnTransport, EventStore, ScheduleDecoder, SyncError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// What happened to one scraped game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Inserted,
    Rescheduled,
    Unchanged,
}

/// Totals for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub weeks: usize,
    pub games: usize,
    pub inserted: usize,
    pub rescheduled: usize,
    pub unchanged: usize,
    pub failed: usize,
}

pub struct ScheduleSynchronizer {
    store: Arc<dyn EventStore>,
    transport: Arc<dyn EspnTransport>,
    decoder: Arc<dyn ScheduleDecoder>,
    interval: Duration,
}

impl ScheduleSynchronizer {
    pub fn new(
        store: Arc<dyn EventStore>,
        transport: Arc<dyn EspnTransport>,
        decoder: Arc<dyn ScheduleDecoder>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            decoder,
            interval,
        }
    }

    /// Sync now, then every `interval`, until `stop` flips to true or its
    /// sender is dropped.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        if *stop.borrow_and_update() {
            info!("Schedule sync stopped before its first pass");
            return;
        }
        info!("Schedule sync started (interval: {:?})", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sync_once().await {
                        Ok(report) => info!(
                            "Schedule sync done: {} weeks, {} games ({} new, {} rescheduled, {} failed)",
                            report.weeks, report.games, report.inserted, report.rescheduled, report.failed
                        ),
                        Err(e) => error!("Schedule sync failed: {}", e),
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Schedule sync stopped");
    }

    pub async fn sync_once(&self) -> Result<SyncReport, SyncError> {
        let page = self.transport.fetch_schedule_html().await?;
        let weeks = self.decoder.decode_weeks(&page)?;
        info!("Schedule lists {} weeks", weeks.len());

        let mut all_games = GamesByDate::new();
        for week in &weeks {
            let page = self.transport.fetch_week_games_html(week).await?;
            let games = self.decoder.decode_week_games(&page)?;
            debug!(
                year = week.year,
                week = week.week_number,
                "Week has {} dates",
                games.len()
            );
            for (date, day) in games {
                all_games.entry(date).or_default().extend(day);
            }
        }

        let mut report = SyncReport {
            weeks: weeks.len(),
            ..Default::default()
        };
        for game in all_games.values().flatten() {
            report.games += 1;
            match self.process_game(game).await {
                Ok(GameOutcome::Inserted) => report.inserted += 1,
                Ok(GameOutcome::Rescheduled) => report.rescheduled += 1,
                Ok(GameOutcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(game_id = %game.id, "Failed to sync game: {}", e);
                }
            }
        }

        Ok(report)
    }

    /// Insert an unseen game or move a known game's kickoff.
    pub async fn process_game(&self, game: &ScrapedGame) -> Result<GameOutcome, SyncError> {
        let kickoff = game.kickoff()?;

        match self.store.get_game(&game.id).await {
            Ok(existing) if existing.game_time == kickoff => Ok(GameOutcome::Unchanged),
            Ok(existing) => {
                info!(
                    game_id = %game.id,
                    "Kickoff moved {} -> {}", existing.game_time, kickoff
                );
                self.store.update_game_time(&game.id, kickoff).await?;
                Ok(GameOutcome::Rescheduled)
            }
            Err(e) if e.is_not_found() => {
                self.insert_game(game, kickoff).await?;
                Ok(GameOutcome::Inserted)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_game(
        &self,
        game: &ScrapedGame,
        kickoff: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let (away, home) = game.away_home()?;
        let away_team = self.store.get_team_by_abbrev(&away.abbrev).await?;
        let home_team = self.store.get_team_by_abbrev(&home.abbrev).await?;

        let row = Game::scheduled(game.id.clone(), kickoff, away_team.id, home_team.id);
        self.store.insert_game(&row).await?;
        info!(game_id = %game.id, "Inserted {} @ {} at {}", away.abbrev, home.abbrev, kickoff);

        // Zero rows for every regulation quarter so the board renders before kickoff
        for abbrev in [&away.abbrev, &home.abbrev] {
            for quarter in 1..=REGULATION_QUARTERS {
                let score = QuarterScore::new(game.id.clone(), abbrev.clone(), quarter.to_string(), 0);
                if let Err(e) = self.store.insert_quarter_score(&score).await {
                    warn!(
                        game_id = %game.id,
                        team = %abbrev,
                        quarter,
                        "Failed to seed quarter score: {}",
                        e
                    );
                }
            }
        }

        Ok(())
    }
}
