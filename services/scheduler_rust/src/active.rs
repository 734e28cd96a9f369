//! Registry of games currently being monitored.
//!
//! Each entry owns its monitor task and a generation number. Replacing an
//! entry aborts the superseded task, and a finishing monitor removes the
//! entry only if it still carries its own generation.

use miniscore_core::models::Game;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

struct ActiveEntry {
    game: Game,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Why a game was (re)admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    New { generation: u64 },
    Rescheduled { generation: u64 },
}

impl Admission {
    pub fn generation(&self) -> u64 {
        match self {
            Admission::New { generation } | Admission::Rescheduled { generation } => *generation,
        }
    }
}

#[derive(Clone, Default)]
pub struct ActiveSet {
    entries: Arc<Mutex<FxHashMap<String, ActiveEntry>>>,
    next_generation: Arc<AtomicU64>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `game` if it is unseen or its kickoff moved. Returns `None` for
    /// a repeat announcement of a game already being monitored.
    pub fn admit(&self, game: &Game) -> Option<Admission> {
        let mut entries = self.entries.lock();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;

        let admission = match entries.get(&game.id) {
            None => Admission::New { generation },
            Some(current) if current.game.game_time != game.game_time => {
                if let Some(task) = &current.task {
                    task.abort();
                }
                info!(
                    game_id = %game.id,
                    "Kickoff moved {} -> {}, replacing monitor",
                    current.game.game_time, game.game_time
                );
                Admission::Rescheduled { generation }
            }
            Some(_) => return None,
        };

        entries.insert(
            game.id.clone(),
            ActiveEntry {
                game: game.clone(),
                generation,
                task: None,
            },
        );
        Some(admission)
    }

    /// Hand the spawned monitor to its entry. If the entry has already been
    /// replaced or removed the task is not tracked.
    pub fn attach(&self, game_id: &str, generation: u64, task: JoinHandle<()>) {
        let mut entries = self.entries.lock();
        match entries.get_mut(game_id) {
            Some(entry) if entry.generation == generation => entry.task = Some(task),
            // Superseded before it was attached
            Some(_) => task.abort(),
            None => {}
        }
    }

    /// Remove `game_id` if its entry still belongs to `generation`.
    pub fn remove(&self, game_id: &str, generation: u64) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(game_id) {
            Some(entry) if entry.generation == generation => {
                entries.remove(game_id);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.entries.lock().contains_key(game_id)
    }

    pub fn get(&self, game_id: &str) -> Option<Game> {
        self.entries.lock().get(game_id).map(|e| e.game.clone())
    }

    pub fn generation_of(&self, game_id: &str) -> Option<u64> {
        self.entries.lock().get(game_id).map(|e| e.generation)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort every tracked monitor and clear the registry.
    pub fn shutdown(&self) {
        let mut entries = self.entries.lock();
        for (_, entry) in entries.drain() {
            if let Some(task) = entry.task {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn game(id: &str, hour: u32) -> Game {
        let kickoff = Utc.with_ymd_and_hms(2023, 9, 10, hour, 0, 0).unwrap();
        Game::scheduled(id, kickoff, Default::default(), Default::default())
    }

    /// A never-ending task plus a probe that drops to one owner once the
    /// task has been cancelled.
    fn pending_task() -> (JoinHandle<()>, Arc<()>) {
        let probe = Arc::new(());
        let held = probe.clone();
        let task = tokio::spawn(async move {
            let _held = held;
            std::future::pending::<()>().await;
        });
        (task, probe)
    }

    async fn cancelled(probe: &Arc<()>) -> bool {
        for _ in 0..10 {
            if Arc::strong_count(probe) == 1 {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }

    #[test]
    fn test_repeat_announcement_is_ignored() {
        let active = ActiveSet::new();
        let first = active.admit(&game("1", 13));
        assert!(matches!(first, Some(Admission::New { .. })));
        assert!(active.admit(&game("1", 13)).is_none());
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_kickoff_change_readmits_with_new_generation() {
        let active = ActiveSet::new();
        let first = active.admit(&game("1", 13)).unwrap();
        let second = active.admit(&game("1", 16)).unwrap();

        assert!(matches!(second, Admission::Rescheduled { .. }));
        assert_ne!(first.generation(), second.generation());
        assert_eq!(
            active.get("1").unwrap().game_time - game("1", 13).game_time,
            Duration::hours(3)
        );

        // The superseded monitor cannot remove the new entry
        assert!(!active.remove("1", first.generation()));
        assert!(active.contains("1"));
        assert!(active.remove("1", second.generation()));
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_rescheduling_aborts_old_task() {
        let active = ActiveSet::new();
        let first = active.admit(&game("1", 13)).unwrap();
        let (task, probe) = pending_task();
        active.attach("1", first.generation(), task);

        active.admit(&game("1", 16)).unwrap();
        assert!(cancelled(&probe).await);
    }

    #[tokio::test]
    async fn test_stale_attach_is_aborted() {
        let active = ActiveSet::new();
        let first = active.admit(&game("1", 13)).unwrap();
        active.admit(&game("1", 16)).unwrap();

        let (task, probe) = pending_task();
        active.attach("1", first.generation(), task);
        assert!(cancelled(&probe).await);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_everything() {
        let active = ActiveSet::new();
        let admitted = active.admit(&game("1", 13)).unwrap();
        let (task, probe) = pending_task();
        active.attach("1", admitted.generation(), task);

        active.shutdown();
        assert!(active.is_empty());
        assert!(cancelled(&probe).await);
    }
}
