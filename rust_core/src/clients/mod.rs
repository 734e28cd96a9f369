//! Outbound transport to the upstream schedule and scoreboard site.

use crate::error::FetchError;
use crate::models::Week;
use async_trait::async_trait;

pub mod espn;

pub use espn::{EspnClient, EspnClientConfig};

/// Raw page and feed fetches. Implementations return the body bytes
/// untouched; decoding is the `ScheduleDecoder`'s job.
#[async_trait]
pub trait EspnTransport: Send + Sync {
    async fn fetch_schedule_html(&self) -> Result<Vec<u8>, FetchError>;

    async fn fetch_week_games_html(&self, week: &Week) -> Result<Vec<u8>, FetchError>;

    async fn fetch_event_detail_html(&self, event_id: &str) -> Result<Vec<u8>, FetchError>;

    async fn fetch_live_scoreboard_json(&self) -> Result<Vec<u8>, FetchError>;
}
