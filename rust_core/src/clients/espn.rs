use super::EspnTransport;
use crate::error::FetchError;
use crate::models::Week;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_SITE_URL: &str = "https://www.espn.com";
pub const DEFAULT_SCOREBOARD_URL: &str = "https://cdn.espn.com/core/nfl/scoreboard?xhr=1&limit=50";

#[derive(Debug, Clone)]
pub struct EspnClientConfig {
    /// Site root for the schedule and game pages
    pub site_url: String,
    /// Full URL of the live scoreboard feed
    pub scoreboard_url: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for EspnClientConfig {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_SITE_URL.to_string(),
            scoreboard_url: DEFAULT_SCOREBOARD_URL.to_string(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// reqwest transport for espn.com pages and the CDN scoreboard feed.
#[derive(Debug, Clone)]
pub struct EspnClient {
    client: Client,
    config: EspnClientConfig,
}

impl EspnClient {
    pub fn new(config: EspnClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    pub fn schedule_url(&self) -> String {
        format!("{}/nfl/schedule", self.site_url())
    }

    /// Week pages are addressed by the site-relative url the schedule lists.
    pub fn week_url(&self, week: &Week) -> String {
        format!("{}{}", self.site_url(), week.url)
    }

    pub fn event_url(&self, event_id: &str) -> String {
        format!("{}/nfl/game/_/gameId/{}", self.site_url(), event_id)
    }

    fn site_url(&self) -> &str {
        self.config.site_url.trim_end_matches('/')
    }

    /// GET with a fixed number of attempts spaced `retry_delay` apart.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!(url = %url, bytes = body.len(), "Fetched");
                    return Ok(body);
                }
                Err(e) => warn!("ESPN fetch failed (attempt {}/{}): {}", attempt, attempts, e),
            }

            if attempt >= attempts {
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts,
                });
            }
            tokio::time::sleep(self.config.retry_delay).await;
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let http = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let resp = self.client.get(url).send().await.map_err(http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(http)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl EspnTransport for EspnClient {
    async fn fetch_schedule_html(&self) -> Result<Vec<u8>, FetchError> {
        self.fetch(&self.schedule_url()).await
    }

    async fn fetch_week_games_html(&self, week: &Week) -> Result<Vec<u8>, FetchError> {
        self.fetch(&self.week_url(week)).await
    }

    async fn fetch_event_detail_html(&self, event_id: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch(&self.event_url(event_id)).await
    }

    async fn fetch_live_scoreboard_json(&self) -> Result<Vec<u8>, FetchError> {
        self.fetch(&self.config.scoreboard_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeasonType;
    use chrono::{TimeZone, Utc};

    fn client(site: &str) -> EspnClient {
        EspnClient::new(EspnClientConfig {
            site_url: site.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_urls() {
        let espn = client("https://www.espn.com/");
        assert_eq!(espn.schedule_url(), "https://www.espn.com/nfl/schedule");
        assert_eq!(
            espn.event_url("401547353"),
            "https://www.espn.com/nfl/game/_/gameId/401547353"
        );

        let week = Week {
            text: "Week 1".into(),
            label: "Week 1".into(),
            start_date: Utc.with_ymd_and_hms(2023, 9, 6, 7, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2023, 9, 12, 6, 59, 0).unwrap(),
            season_type: SeasonType::Reg,
            week_number: 1,
            year: 2023,
            url: "/nfl/schedule/_/week/1/year/2023/seasontype/2".into(),
            is_active: true,
        };
        assert_eq!(
            espn.week_url(&week),
            "https://www.espn.com/nfl/schedule/_/week/1/year/2023/seasontype/2"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        // Nothing listens on the discard port; every attempt is a connect error.
        let espn = EspnClient::new(EspnClientConfig {
            site_url: "http://127.0.0.1:9".into(),
            max_attempts: 2,
            retry_delay: Duration::from_millis(10),
            request_timeout: Duration::from_millis(200),
            ..Default::default()
        });

        let err = espn.fetch_schedule_html().await.unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 2, .. }));
    }
}
