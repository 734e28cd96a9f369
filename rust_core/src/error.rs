//! Error taxonomy shared by the scraper, transport and store layers.

use thiserror::Error;

/// Persistence failures.
///
/// `NotFound` is not a failure for callers that branch between insert and
/// update; everything else is a write/read error against the database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {0} found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Network failures talking to the upstream site.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("gave up on {url} after {attempts} attempts")]
    Exhausted { url: String, attempts: u32 },
}

/// Payload extraction and decoding failures.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("marker {0:?} not found in page")]
    MarkerNotFound(String),

    #[error("expected {expected:?} after marker, found {found:?}")]
    UnexpectedStart { expected: char, found: Option<char> },

    #[error("embedded json never closed its outer {0:?}")]
    Unbalanced(char),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid timestamp {value:?}: {source}")]
    BadTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("game {game_id} lists {found} teams, need two")]
    NotEnoughTeams { game_id: String, found: usize },
}

/// Failure of one synchronization or update step.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("game {0} is not on the live scoreboard")]
    NotOnScoreboard(String),
}
