//! Consumes the weekly feed and starts one monitor per newly seen game.

use crate::active::{ActiveSet, Admission};
use crate::monitor::{EventMonitor, MonitorContext};
use miniscore_core::models::Game;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct EventScheduler {
    ctx: Arc<MonitorContext>,
}

impl EventScheduler {
    pub fn new(ctx: Arc<MonitorContext>) -> Self {
        Self { ctx }
    }

    pub fn active(&self) -> &ActiveSet {
        &self.ctx.active
    }

    /// Drain the feed until every sender is gone.
    pub async fn run(self, mut feed: mpsc::Receiver<Game>) {
        info!("Scheduler started");
        while let Some(game) = feed.recv().await {
            self.schedule(game);
        }
        info!("Feed closed, scheduler stopping");
    }

    /// Start a monitor for `game` unless one is already running for the
    /// same kickoff. Returns whether a monitor was started.
    pub fn schedule(&self, game: Game) -> bool {
        let Some(admission) = self.ctx.active.admit(&game) else {
            debug!(game_id = %game.id, "Already monitored");
            return false;
        };

        match admission {
            Admission::New { .. } => info!(game_id = %game.id, "Starting monitor"),
            Admission::Rescheduled { .. } => info!(game_id = %game.id, "Restarting monitor"),
        }

        let id = game.id.clone();
        let generation = admission.generation();
        let monitor = EventMonitor::new(game, generation, self.ctx.clone());
        let task = tokio::spawn(monitor.run());
        self.ctx.active.attach(&id, generation, task);
        true
    }
}
