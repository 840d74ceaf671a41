//! Output formatting and persistence for round reports.
//!
//! Supports pretty-printing, JSON serialization, and a CSV audit log.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::pipeline::RoundReport;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// One owner's score for one run, as written to the audit CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub timestamp: DateTime<Utc>,
    pub season: u16,
    pub round: u32,
    pub race_name: Option<String>,
    pub owner: String,
    pub score: f64,
    pub total_points: u64,
    pub roster_size: usize,
    /// Missing drivers joined with `;`.
    pub missing_drivers: String,
    pub cell: Option<String>,
}

impl ScoreRecord {
    /// One record per owner score in `report`.
    pub fn from_report(report: &RoundReport) -> Vec<Self> {
        let timestamp = Utc::now();
        report
            .scores
            .iter()
            .map(|s| ScoreRecord {
                timestamp,
                season: report.season,
                round: report.round,
                race_name: report.race_name.clone(),
                owner: s.owner.clone(),
                score: s.score,
                total_points: s.total_points,
                roster_size: s.roster_size,
                missing_drivers: s.missing.join(";"),
                cell: report
                    .placements
                    .iter()
                    .find(|p| p.owner == s.owner)
                    .map(|p| p.cell.clone()),
            })
            .collect()
    }
}

/// Logs the report using Rust's debug pretty-print format.
pub fn print_pretty(report: &RoundReport) {
    debug!("{:#?}", report);
}

/// Logs the report as pretty-printed JSON.
pub fn print_json(report: &RoundReport) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Logs one line per owner, highest score first.
pub fn print_summary(report: &RoundReport) {
    let mut scores: Vec<_> = report.scores.iter().collect();
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));

    for (rank, s) in scores.iter().enumerate() {
        info!(
            rank = rank + 1,
            owner = %s.owner,
            score = s.score,
            missing = s.missing.len(),
            "Round score"
        );
    }
}

/// Appends `records` as rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(path: &Path, records: &[ScoreRecord]) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = records.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}
