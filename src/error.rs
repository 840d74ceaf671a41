use thiserror::Error;

use crate::workbook::WorkbookError;

#[derive(Debug, Error)]
pub enum FantasyError {
    #[error("results service unavailable: {reason} (URL: {url})")]
    ServiceUnavailable { url: String, reason: String },

    #[error("results API returned status {status} (URL: {url})")]
    ApiStatus { status: u16, url: String },

    #[error("results request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("results API returned malformed JSON: {message} (URL: {url})")]
    MalformedJson { url: String, message: String },

    #[error("no race found for season {season} round {round}")]
    RaceNotFound { season: u16, round: u32 },

    #[error("results payload is missing '{path}'")]
    MissingField { path: String },

    #[error("driver '{driver}' has points value {value} that is not a non-negative integer")]
    InvalidPoints { driver: String, value: String },

    #[error("owner '{owner}' has no drivers on the roster")]
    RosterIncomplete { owner: String },

    #[error("owner '{owner}' has no column in the standings header of '{sheet}'")]
    UnknownOwner { owner: String, sheet: String },

    #[error("workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FantasyError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Maps a transport-level failure to the error kind the caller acts on.
    ///
    /// Timeouts and refused connections mean the service could not be
    /// reached at all.
    pub fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ServiceUnavailable {
                url: url.to_string(),
                reason: "request timed out".to_string(),
            }
        } else if err.is_connect() {
            Self::ServiceUnavailable {
                url: url.to_string(),
                reason: format!("connection failed: {err}"),
            }
        } else {
            Self::Http(err)
        }
    }

    /// Maps a non-success HTTP status.
    pub fn from_status(url: &str, status: reqwest::StatusCode) -> Self {
        if status.is_server_error() {
            Self::ServiceUnavailable {
                url: url.to_string(),
                reason: format!("server returned {status}"),
            }
        } else {
            Self::ApiStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }
        }
    }

    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. })
    }
}
