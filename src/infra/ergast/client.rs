use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::FantasyError;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::parser::parse_results;
use crate::services::results_api::{RaceResults, ResultsApi};

/// Results provider backed by the Ergast F1 API (or a compatible mirror).
pub struct ErgastClient<C = BasicClient> {
    http: C,
    base_url: String,
    season: u16,
}

impl ErgastClient<BasicClient> {
    /// Builds a client from `config`, with its request timeout applied.
    pub fn from_config(config: &Config) -> Result<Self, FantasyError> {
        let http = BasicClient::with_timeout(config.request_timeout())?;
        Ok(Self::with_http(http, &config.api_base_url, config.season))
    }
}

impl<C: HttpClient> ErgastClient<C> {
    pub fn with_http(http: C, base_url: &str, season: u16) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            season,
        }
    }

    pub fn results_url(&self, round: u32) -> String {
        format!("{}/{}/{}/results.json", self.base_url, self.season, round)
    }
}

#[async_trait]
impl<C: HttpClient> ResultsApi for ErgastClient<C> {
    #[tracing::instrument(skip(self), fields(season = self.season))]
    async fn race_results(&self, round: u32) -> Result<RaceResults, FantasyError> {
        let url = self.results_url(round);
        debug!(url = %url, "Fetching race results");

        let bytes = fetch_bytes(&self.http, &url).await?;
        let results = parse_results(&bytes, self.season, round, &url)?;

        info!(
            race = results.race_name.as_deref().unwrap_or("unknown"),
            drivers = results.len(),
            "Race results fetched"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_url_trims_trailing_slash() {
        let config = Config {
            api_base_url: "https://api.example.org/ergast/f1/".into(),
            season: 2024,
            ..Config::default()
        };
        let client = ErgastClient::from_config(&config).unwrap();

        assert_eq!(
            client.results_url(7),
            "https://api.example.org/ergast/f1/2024/7/results.json"
        );
        assert_eq!(
            ErgastClient::from_config(&Config::default()).unwrap().results_url(3),
            "https://ergast.com/api/f1/2024/3/results.json"
        );
    }
}
