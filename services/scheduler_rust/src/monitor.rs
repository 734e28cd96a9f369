//! Per-game polling state machine.
//!
//! ```text
//! Polling -> Scheduled  : sleep until near kickoff, no writes
//!         -> InProgress : write scores and clock
//!         -> Final      : terminal write, leave the active set, exit
//! ```
//!
//! Every pass ends with the regular poll interval. Fetch and decode errors
//! are logged and retried on the next pass; only Final stops a monitor.

use crate::active::ActiveSet;
use crate::config::MonitorConfig;
use crate::updater::GameUpdater;
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use miniscore_core::models::{EventPhase, Game};
use miniscore_core::{EspnTransport, ScheduleDecoder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Wait used when a kickoff listing cannot be parsed.
pub const KICKOFF_PARSE_RETRY: Duration = Duration::from_secs(1);

const LISTED_KICKOFF_FORMAT: &str = "%m/%d/%Y %I:%M %p";

/// Dependencies shared by every monitor.
pub struct MonitorContext {
    pub transport: Arc<dyn EspnTransport>,
    pub decoder: Arc<dyn ScheduleDecoder>,
    pub updater: Arc<GameUpdater>,
    pub active: ActiveSet,
    pub config: MonitorConfig,
}

/// Result of one polling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Game is final; the monitor exits
    Finished,
    /// Wait this long, plus the poll interval, before the next pass
    Wait(Duration),
}

pub struct EventMonitor {
    game: Game,
    generation: u64,
    ctx: Arc<MonitorContext>,
}

impl EventMonitor {
    pub fn new(game: Game, generation: u64, ctx: Arc<MonitorContext>) -> Self {
        Self {
            game,
            generation,
            ctx,
        }
    }

    pub async fn run(self) {
        info!(game_id = %self.game.id, kickoff = %self.game.game_time, "Monitor started");
        loop {
            match self.poll_once().await {
                Step::Finished => break,
                Step::Wait(extra) => {
                    tokio::time::sleep(extra + self.ctx.config.poll_interval).await;
                }
            }
        }
        info!(game_id = %self.game.id, "Monitor exiting");
    }

    pub async fn poll_once(&self) -> Step {
        let id = &self.game.id;

        let page = match self.ctx.transport.fetch_event_detail_html(id).await {
            Ok(page) => page,
            Err(e) => {
                warn!(game_id = %id, "Failed to fetch game detail: {}", e);
                return Step::Wait(Duration::ZERO);
            }
        };
        let info = match self.ctx.decoder.decode_game_info(&page) {
            Ok(info) => info,
            Err(e) => {
                warn!(game_id = %id, "Failed to decode game detail: {}", e);
                return Step::Wait(Duration::ZERO);
            }
        };

        match info.phase() {
            EventPhase::Final => {
                self.ctx.updater.finalize(&info).await;
                self.ctx.active.remove(id, self.generation);
                Step::Finished
            }
            EventPhase::Scheduled => {
                let wait = kickoff_wait(&info.status.det, Utc::now(), self.ctx.config.kickoff_lookahead)
                    .unwrap_or_else(|| {
                        warn!(game_id = %id, detail = %info.status.det, "Unparseable kickoff listing");
                        KICKOFF_PARSE_RETRY
                    });
                info!(game_id = %id, "Scheduled, sleeping {:?}", wait);
                Step::Wait(wait)
            }
            EventPhase::InProgress => {
                debug!(game_id = %id, status = %info.status.desc, "In progress");
                self.ctx.updater.update_game(&info).await;
                Step::Wait(Duration::ZERO)
            }
        }
    }
}

/// Parse a listing like `9/10 - 1:00 PM EDT` into a naive wall time in
/// `year`. The zone token is not interpreted.
pub fn parse_listed_kickoff(detail: &str, year: i32) -> Option<NaiveDateTime> {
    let (date, time) = detail.split_once(" - ")?;
    let mut parts = time.split_whitespace();
    let clock = parts.next()?;
    let meridiem = parts.next()?;

    let text = format!("{}/{} {} {}", date.trim(), year, clock, meridiem);
    NaiveDateTime::parse_from_str(&text, LISTED_KICKOFF_FORMAT).ok()
}

/// How long a scheduled game's monitor should sleep.
///
/// The listed wall time is read as UTC and compared against `now` shifted
/// back by `lookahead`; for Eastern listings that lands on the real kickoff.
/// Past kickoffs give zero. `None` if the listing does not parse.
pub fn kickoff_wait(
    detail: &str,
    now: DateTime<Utc>,
    lookahead: chrono::Duration,
) -> Option<Duration> {
    let listed = parse_listed_kickoff(detail, now.year())?.and_utc();
    let wait = listed - (now - lookahead);
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_parse_listed_kickoff() {
        let parsed = parse_listed_kickoff("9/10 - 1:00 PM EDT", 2023).unwrap();
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2023, 9, 10)
                .unwrap()
                .and_hms_opt(13, 0, 0)
                .unwrap()
        );

        let night = parse_listed_kickoff("12/25 - 8:15 PM EST", 2023).unwrap();
        assert_eq!(night.format("%m-%d %H:%M").to_string(), "12-25 20:15");
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(parse_listed_kickoff("Sun, September 10th", 2023).is_none());
        assert!(parse_listed_kickoff("9/10 - TBD", 2023).is_none());
        assert!(parse_listed_kickoff("", 2023).is_none());
    }

    #[test]
    fn test_kickoff_wait_uses_lookahead() {
        let lookahead = chrono::Duration::hours(4);
        // 13:00 UTC on game day: listed 1:00 PM is 13:00, now - 4h is 09:00
        let now = Utc.with_ymd_and_hms(2023, 9, 10, 13, 0, 0).unwrap();
        assert_eq!(
            kickoff_wait("9/10 - 1:00 PM EDT", now, lookahead),
            Some(Duration::from_secs(4 * 3600))
        );
    }

    #[test]
    fn test_kickoff_wait_in_past_is_zero() {
        let now = Utc.with_ymd_and_hms(2023, 9, 11, 0, 0, 0).unwrap();
        assert_eq!(
            kickoff_wait("9/10 - 1:00 PM EDT", now, chrono::Duration::hours(4)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_kickoff_wait_unparseable() {
        let now = Utc.with_ymd_and_hms(2023, 9, 10, 0, 0, 0).unwrap();
        assert!(kickoff_wait("postponed", now, chrono::Duration::hours(4)).is_none());
    }
}
