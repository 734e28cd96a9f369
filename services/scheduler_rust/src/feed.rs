//! Daily re-announcement of the current week's games.

use chrono::Utc;
use miniscore_core::models::Game;
use miniscore_core::week_window::{next_utc_midnight, WeekWindow};
use miniscore_core::EventStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

pub struct WeeklyEventFeed {
    store: Arc<dyn EventStore>,
}

impl WeeklyEventFeed {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Games of the week containing now; a read failure is an empty week.
    pub async fn current_week(&self) -> Vec<Game> {
        let window = WeekWindow::containing(Utc::now());
        info!("Loading games between {} and {}", window.start, window.end);

        match self.store.get_games_in_window(window.start, window.end).await {
            Ok(games) => games,
            Err(e) => {
                error!("Failed to load this week's games: {}", e);
                Vec::new()
            }
        }
    }

    /// Announce this week's games, then sleep until the next UTC midnight,
    /// forever. Returns once the scheduler side of the channel is gone.
    pub async fn run(self, out: mpsc::Sender<Game>) {
        loop {
            let games = self.current_week().await;
            info!("Announcing {} games", games.len());
            for game in games {
                if out.send(game).await.is_err() {
                    info!("Scheduler gone, feed stopping");
                    return;
                }
            }

            let now = Utc::now();
            let wait = (next_utc_midnight(now) - now)
                .to_std()
                .unwrap_or(Duration::from_secs(1));
            info!("Next announcement in {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}
