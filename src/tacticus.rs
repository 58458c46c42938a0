use std::time::Duration;

use anyhow::Context;

use crate::models::SeasonData;

const TACTICUS_API_URL: &str = "https://api.tacticusgame.com/api/v1/guildRaid";

/// The API occasionally stalls; a stuck fetch must not hang the scheduler.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only client for the Tacticus guild raid endpoint.
pub struct TacticusClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TacticusClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: TACTICUS_API_URL.to_string(),
            api_key,
        })
    }

    /// Fetch raid data for an explicit season, or the current one when `None`.
    /// Any non-2xx response fails the cycle; the next scheduled run retries.
    pub async fn fetch_season(&self, season: Option<&str>) -> anyhow::Result<SeasonData> {
        let url = match season {
            Some(s) => {
                tracing::info!("fetching season {s} raid data");
                format!("{}/{s}", self.base_url)
            }
            None => {
                tracing::info!("fetching current season raid data");
                self.base_url.clone()
            }
        };

        let data = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .header("X-API-KEY", &self.api_key)
            .send()
            .await
            .context("guild raid fetch failed")?
            .error_for_status()?
            .json::<SeasonData>()
            .await
            .context("guild raid response did not match the expected shape")?;

        Ok(data)
    }
}
