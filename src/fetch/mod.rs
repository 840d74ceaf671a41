mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::FantasyError;
use tracing::debug;

/// GETs `url` and returns the body, mapping transport and status failures
/// onto [`FantasyError`].
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, FantasyError> {
    let parsed = url
        .parse()
        .map_err(|e| FantasyError::config_error(format!("invalid URL '{url}': {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client
        .execute(req)
        .await
        .map_err(|e| FantasyError::from_transport(url, e))?;

    let status = resp.status();
    debug!(url, status = status.as_u16(), "Response received");
    if !status.is_success() {
        return Err(FantasyError::from_status(url, status));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| FantasyError::from_transport(url, e))?;
    Ok(bytes.to_vec())
}
