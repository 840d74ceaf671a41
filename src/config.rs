//! Run configuration.
//!
//! Defaults match the league's own workbook. A JSON file can replace any
//! subset of fields, and `F1_FANTASY_*` environment variables override the
//! file:
//!
//! ```json
//! {
//!   "spreadsheet_path": "F1 Fantasy.xlsx",
//!   "season": 2024,
//!   "api_base_url": "https://ergast.com/api/f1"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FantasyError;

pub const ENV_SPREADSHEET: &str = "F1_FANTASY_SPREADSHEET";
pub const ENV_SEASON: &str = "F1_FANTASY_SEASON";
pub const ENV_API_BASE_URL: &str = "F1_FANTASY_API_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "F1_FANTASY_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Workbook holding both the roster and the standings sheets.
    pub spreadsheet_path: PathBuf,
    pub season: u16,
    /// Base of the results API; `/{season}/{round}/results.json` is appended.
    pub api_base_url: String,
    pub roster_sheet: String,
    pub standings_sheet: String,
    /// First roster column (1-based; 2 is column B).
    pub roster_first_column: u32,
    /// Number of owner columns on the roster sheet.
    pub roster_owner_count: u32,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_path: PathBuf::from("F1 Fantasy.xlsx"),
            season: 2024,
            api_base_url: "https://ergast.com/api/f1".to_string(),
            roster_sheet: "2024 Draft".to_string(),
            standings_sheet: "2024 Standings".to_string(),
            roster_first_column: 2,
            roster_owner_count: 3,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads the config from a JSON file at `path`. Missing fields keep
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self, FantasyError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FantasyError::config_error(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            FantasyError::config_error(format!("invalid config {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Config file loaded");
        Ok(config)
    }

    /// Applies `F1_FANTASY_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self, FantasyError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, FantasyError> {
        if let Some(path) = lookup(ENV_SPREADSHEET) {
            self.spreadsheet_path = PathBuf::from(path);
        }
        if let Some(season) = lookup(ENV_SEASON) {
            self.season = season
                .trim()
                .parse()
                .map_err(|_| FantasyError::config_error(format!("{ENV_SEASON}='{season}' is not a year")))?;
        }
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = secs.trim().parse().map_err(|_| {
                FantasyError::config_error(format!("{ENV_TIMEOUT_SECS}='{secs}' is not a number of seconds"))
            })?;
        }
        Ok(self)
    }

    /// Checks the values the pipeline relies on.
    pub fn validate(&self) -> Result<(), FantasyError> {
        reqwest::Url::parse(&self.api_base_url).map_err(|e| {
            FantasyError::config_error(format!("api_base_url '{}': {e}", self.api_base_url))
        })?;
        if self.season == 0 {
            return Err(FantasyError::config_error("season must be positive"));
        }
        if self.request_timeout_secs == 0 {
            return Err(FantasyError::config_error("request_timeout_secs must be positive"));
        }
        if self.roster_first_column == 0 || self.roster_owner_count == 0 {
            return Err(FantasyError::config_error(
                "roster_first_column and roster_owner_count must be positive",
            ));
        }
        if self.roster_sheet.trim().is_empty() || self.standings_sheet.trim().is_empty() {
            return Err(FantasyError::config_error("sheet names must not be empty"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Roster owner columns, inclusive.
    pub fn roster_columns(&self) -> std::ops::RangeInclusive<u32> {
        self.roster_first_column..=self.roster_first_column + self.roster_owner_count - 1
    }
}
