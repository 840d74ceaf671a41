//! Writes round scores into the standings sheet.
//!
//! Row 1 of the standings sheet names the owners from column 2 onwards;
//! row `round + 1` holds the scores for that round. Owners are matched to
//! columns by header name, so the order of the roster sheet does not matter.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::FantasyError;
use crate::scoring::OwnerScore;
use crate::workbook::{CellRef, Sheet, Workbook};

const HEADER_ROW: u32 = 1;
const FIRST_OWNER_COLUMN: u32 = 2;

/// One score placed in the standings sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub owner: String,
    pub cell: String,
    pub row: u32,
    pub column: u32,
    pub score: f64,
}

/// Standings row for `round`.
pub fn round_row(round: u32) -> u32 {
    round + HEADER_ROW
}

/// Maps each owner score to its cell without touching the workbook.
///
/// # Errors
///
/// Returns [`FantasyError::UnknownOwner`] if an owner has no header.
pub fn plan_placements(sheet: &Sheet, scores: &[OwnerScore], round: u32) -> Result<Vec<Placement>, FantasyError> {
    let mut columns: HashMap<String, u32> = HashMap::new();
    for (column, owner) in sheet.row_texts(HEADER_ROW, FIRST_OWNER_COLUMN) {
        if let Some(first) = columns.get(&owner) {
            warn!(owner = %owner, first = *first, duplicate = column, "Duplicate standings header, first column wins");
            continue;
        }
        columns.insert(owner, column);
    }

    let row = round_row(round);
    scores
        .iter()
        .map(|score| {
            let column = *columns
                .get(&score.owner)
                .ok_or_else(|| FantasyError::UnknownOwner {
                    owner: score.owner.clone(),
                    sheet: sheet.name().to_string(),
                })?;
            Ok(Placement {
                owner: score.owner.clone(),
                cell: CellRef::new(row, column).to_string(),
                row,
                column,
                score: score.score,
            })
        })
        .collect()
}

/// Writes `scores` for `round` into `sheet_name` and saves the workbook.
///
/// With `save == false` the placements are computed and returned but the
/// file is left alone.
#[instrument(skip(workbook, scores), fields(path = %workbook.path().display()))]
pub fn write_standings(
    workbook: &mut Workbook,
    sheet_name: &str,
    scores: &[OwnerScore],
    round: u32,
    save: bool,
) -> Result<Vec<Placement>, FantasyError> {
    let sheet = workbook.sheet(sheet_name)?;
    let placements = plan_placements(&sheet, scores, round)?;

    if !save {
        info!(cells = placements.len(), "Dry run, standings not saved");
        return Ok(placements);
    }

    for p in &placements {
        workbook.set_number(sheet_name, CellRef::new(p.row, p.column), p.score)?;
    }
    workbook.save()?;

    info!(cells = placements.len(), row = round_row(round), "Standings updated");
    Ok(placements)
}
