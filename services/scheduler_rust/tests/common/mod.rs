//! Shared fixtures: a scripted ESPN transport and page builders.

#![allow(dead_code)]

use async_trait::async_trait;
use miniscore_core::models::{Team, Week};
use miniscore_core::{EspnPageDecoder, EspnTransport, FetchError, MemoryEventStore, UpdateCache};
use parking_lot::Mutex;
use scheduler_rust::active::ActiveSet;
use scheduler_rust::config::MonitorConfig;
use scheduler_rust::monitor::MonitorContext;
use scheduler_rust::updater::GameUpdater;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const GAME_ID: &str = "401547353";

fn unavailable(url: &str) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status: 503,
    }
}

/// Transport serving canned pages. Detail pages are served in order and the
/// last one repeats; anything not scripted answers 503.
#[derive(Default)]
pub struct FakeEspn {
    schedule: Mutex<Option<String>>,
    weeks: Mutex<HashMap<u32, String>>,
    details: Mutex<VecDeque<String>>,
    scoreboard: Mutex<Option<String>>,
    schedule_fetches: AtomicUsize,
    detail_fetches: AtomicUsize,
}

impl FakeEspn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_schedule(&self, page: Option<String>) {
        *self.schedule.lock() = page;
    }

    pub fn set_week(&self, week_number: u32, page: String) {
        self.weeks.lock().insert(week_number, page);
    }

    pub fn push_detail(&self, page: String) {
        self.details.lock().push_back(page);
    }

    pub fn set_scoreboard(&self, body: Option<String>) {
        *self.scoreboard.lock() = body;
    }

    pub fn schedule_fetches(&self) -> usize {
        self.schedule_fetches.load(Ordering::SeqCst)
    }

    pub fn detail_fetches(&self) -> usize {
        self.detail_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EspnTransport for FakeEspn {
    async fn fetch_schedule_html(&self) -> Result<Vec<u8>, FetchError> {
        self.schedule_fetches.fetch_add(1, Ordering::SeqCst);
        self.schedule
            .lock()
            .clone()
            .map(String::into_bytes)
            .ok_or_else(|| unavailable("schedule"))
    }

    async fn fetch_week_games_html(&self, week: &Week) -> Result<Vec<u8>, FetchError> {
        self.weeks
            .lock()
            .get(&week.week_number)
            .cloned()
            .map(String::into_bytes)
            .ok_or_else(|| unavailable(&week.url))
    }

    async fn fetch_event_detail_html(&self, event_id: &str) -> Result<Vec<u8>, FetchError> {
        self.detail_fetches.fetch_add(1, Ordering::SeqCst);
        let mut details = self.details.lock();
        let page = if details.len() > 1 {
            details.pop_front()
        } else {
            details.front().cloned()
        };
        page.map(String::into_bytes)
            .ok_or_else(|| unavailable(event_id))
    }

    async fn fetch_live_scoreboard_json(&self) -> Result<Vec<u8>, FetchError> {
        self.scoreboard
            .lock()
            .clone()
            .map(String::into_bytes)
            .ok_or_else(|| unavailable("scoreboard"))
    }
}

// ============================================================================
// Page builders
// ============================================================================

fn week_value(number: u32) -> Value {
    json!({
        "text": format!("Week {}", number),
        "label": format!("Week {}", number),
        "startDate": "2023-09-06T07:00Z",
        "endDate": "2023-09-12T06:59Z",
        "seasonType": 2,
        "weekNumber": number,
        "year": 2023,
        "url": format!("/nfl/schedule/_/week/{}/year/2023/seasontype/2", number),
        "isActive": number == 1
    })
}

/// Schedule page listing regular-season weeks `1..=count`.
pub fn schedule_page(count: u32) -> String {
    let weeks: Vec<Value> = (1..=count).map(week_value).collect();
    format!(
        "<html><script>window['__espnfitt__']={{\"page\":{{\"content\":{{\"weeks\":{}}}}}}};</script></html>",
        Value::Array(weeks)
    )
}

/// A schedule entry with the away team listed first.
pub fn scheduled_game(id: &str, away: &str, home: &str, date: &str) -> Value {
    json!({
        "id": id,
        "competitors": [
            { "abbrev": away, "isHome": false },
            { "abbrev": home, "isHome": true }
        ],
        "date": date
    })
}

/// Week page with the given games grouped under their date headings.
pub fn week_page(days: &[(&str, Vec<Value>)]) -> String {
    let events: serde_json::Map<String, Value> = days
        .iter()
        .map(|(date, games)| (date.to_string(), Value::Array(games.clone())))
        .collect();
    format!(
        "<html><script>window['__espnfitt__']={{\"page\":{{\"content\":{{\"events\":{}}}}}}};</script></html>",
        Value::Object(events)
    )
}

/// Game page whose summary strip has the given status and line scores.
pub fn detail_page(desc: &str, det: &str, away: &[i32], home: &[i32]) -> String {
    let lines = |scores: &[i32]| -> Vec<Value> {
        scores
            .iter()
            .map(|s| json!({ "displayValue": s.to_string() }))
            .collect()
    };
    let strip = json!({
        "gid": GAME_ID,
        "status": { "desc": desc, "det": det, "state": "" },
        "tms": [
            { "abbrev": "SF", "isHome": false, "linescores": lines(away) },
            { "abbrev": "PIT", "isHome": true, "linescores": lines(home) }
        ]
    });
    format!(
        "<html><script>window['__espnfitt__']={{\"page\":{{\"content\":{{\"gamepackage\":{{\"gmStrp\":{}}}}}}}}};</script></html>",
        strip
    )
}

/// Live scoreboard listing the test game at `clock` in `period`.
pub fn scoreboard_body(clock: &str, period: i32) -> String {
    json!({
        "content": {
            "sbData": {
                "events": [
                    {
                        "uid": format!("s:20~l:28~e:{}", GAME_ID),
                        "status": { "period": period, "displayClock": clock }
                    }
                ]
            }
        }
    })
    .to_string()
}

// ============================================================================
// Wiring
// ============================================================================

pub struct Harness {
    pub store: Arc<MemoryEventStore>,
    pub espn: Arc<FakeEspn>,
    pub ctx: Arc<MonitorContext>,
    pub away: Team,
    pub home: Team,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryEventStore::new());
        let away = store.add_team("San Francisco 49ers", "SF");
        let home = store.add_team("Pittsburgh Steelers", "PIT");
        let espn = Arc::new(FakeEspn::new());
        let decoder = Arc::new(EspnPageDecoder::new().expect("decoder"));

        let updater = Arc::new(GameUpdater::new(
            store.clone(),
            espn.clone(),
            decoder.clone(),
            Arc::new(UpdateCache::new()),
        ));
        let ctx = Arc::new(MonitorContext {
            transport: espn.clone(),
            decoder,
            updater,
            active: ActiveSet::new(),
            config: MonitorConfig::default(),
        });

        Self {
            store,
            espn,
            ctx,
            away,
            home,
        }
    }
}
