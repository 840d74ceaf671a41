//! Per-owner round scores.
//!
//! An owner's score is the average points of the drivers on their roster.
//! Drivers missing from the race results score zero but still count toward
//! the roster size.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::FantasyError;
use crate::roster::Roster;
use crate::services::results_api::RaceResults;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerScore {
    pub owner: String,
    pub score: f64,
    pub total_points: u64,
    pub roster_size: usize,
    /// Rostered drivers with no entry in the results.
    pub missing: Vec<String>,
}

/// Scores every owner in `roster` against `results`, in roster order.
///
/// # Errors
///
/// Returns [`FantasyError::RosterIncomplete`] if an owner has no drivers;
/// an average over zero drivers is not a score.
pub fn score_owners(results: &RaceResults, roster: &Roster) -> Result<Vec<OwnerScore>, FantasyError> {
    roster
        .owners
        .iter()
        .map(|entry| {
            if entry.drivers.is_empty() {
                return Err(FantasyError::RosterIncomplete {
                    owner: entry.owner.clone(),
                });
            }

            let mut total_points = 0u64;
            let mut missing = Vec::new();

            for driver in &entry.drivers {
                match results.points_for(driver) {
                    Some(points) => total_points += u64::from(points),
                    None => {
                        warn!(
                            owner = %entry.owner,
                            driver = %driver,
                            round = results.round,
                            "Driver did not participate in the race"
                        );
                        missing.push(driver.clone());
                    }
                }
            }

            let roster_size = entry.drivers.len();
            let score = total_points as f64 / roster_size as f64;
            debug!(owner = %entry.owner, total_points, roster_size, score, "Owner scored");

            Ok(OwnerScore {
                owner: entry.owner.clone(),
                score,
                total_points,
                roster_size,
                missing,
            })
        })
        .collect()
}
