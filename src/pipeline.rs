//! One scoring run: fetch results, score rosters, write standings.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::Config;
use crate::roster::{Roster, read_roster};
use crate::scoring::{OwnerScore, score_owners};
use crate::services::results_api::{RaceResults, ResultsApi};
use crate::standings::{Placement, write_standings};
use crate::workbook::Workbook;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Compute everything but leave the workbook unchanged.
    pub dry_run: bool,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub season: u16,
    pub round: u32,
    pub race_name: Option<String>,
    pub scores: Vec<OwnerScore>,
    pub placements: Vec<Placement>,
    pub saved: bool,
}

impl RoundReport {
    pub fn score_for(&self, owner: &str) -> Option<&OwnerScore> {
        self.scores.iter().find(|s| s.owner == owner)
    }
}

/// Fetches the results for `round`.
pub async fn fetch_results<A: ResultsApi + ?Sized>(api: &A, round: u32) -> Result<RaceResults> {
    api.race_results(round)
        .await
        .with_context(|| format!("fetching results for round {round}"))
}

/// Reads the rosters from the configured workbook.
pub fn load_roster(config: &Config) -> Result<Roster> {
    let workbook = Workbook::open(&config.spreadsheet_path)
        .with_context(|| format!("opening {}", config.spreadsheet_path.display()))?;
    let roster = read_roster(&workbook, config)
        .with_context(|| format!("reading roster sheet '{}'", config.roster_sheet))?;
    Ok(roster)
}

/// Runs the full pipeline for `round`.
///
/// The workbook is opened once to read the rosters and again to write the
/// standings, so nothing is held open while scoring.
#[instrument(skip(api, config), fields(season = config.season, path = %config.spreadsheet_path.display()))]
pub async fn run_round<A: ResultsApi + ?Sized>(
    api: &A,
    config: &Config,
    round: u32,
    options: &RunOptions,
) -> Result<RoundReport> {
    let results = fetch_results(api, round).await?;

    let roster = load_roster(config)?;
    let scores = score_owners(&results, &roster).context("scoring owners")?;

    let mut workbook = Workbook::open(&config.spreadsheet_path)
        .with_context(|| format!("opening {}", config.spreadsheet_path.display()))?;
    let placements = write_standings(
        &mut workbook,
        &config.standings_sheet,
        &scores,
        round,
        !options.dry_run,
    )
    .with_context(|| format!("writing standings sheet '{}'", config.standings_sheet))?;

    info!(
        round,
        owners = scores.len(),
        saved = !options.dry_run,
        "Round scored"
    );

    Ok(RoundReport {
        season: results.season,
        round,
        race_name: results.race_name,
        scores,
        placements,
        saved: !options.dry_run,
    })
}
