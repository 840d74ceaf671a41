//! Owner rosters read from the draft sheet.
//!
//! Each owner has one column: the header cell (row 1) holds the owner's name
//! and the cells below hold the drafted drivers. The last populated row of
//! the region is a footer and is not part of any roster.

use std::ops::RangeInclusive;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::FantasyError;
use crate::workbook::{Sheet, Workbook, column_letters};

const HEADER_ROW: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerRoster {
    pub owner: String,
    /// Column the owner occupies on the roster sheet.
    pub column: u32,
    pub drivers: Vec<String>,
}

/// Owners in roster-sheet column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Roster {
    pub owners: Vec<OwnerRoster>,
}

impl Roster {
    pub fn owner(&self, name: &str) -> Option<&OwnerRoster> {
        self.owners.iter().find(|o| o.owner == name)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Reads the roster sheet named in `config` from `workbook`.
#[instrument(skip_all, fields(sheet = %config.roster_sheet))]
pub fn read_roster(workbook: &Workbook, config: &Config) -> Result<Roster, FantasyError> {
    let sheet = workbook.sheet(&config.roster_sheet)?;
    let roster = roster_from_sheet(&sheet, config.roster_columns());

    debug!(
        owners = roster.len(),
        drivers = roster.owners.iter().map(|o| o.drivers.len()).sum::<usize>(),
        "Roster read"
    );
    Ok(roster)
}

/// Builds the roster from the owner columns in `columns`.
///
/// Columns with a blank header are skipped, as are blank driver cells.
pub fn roster_from_sheet(sheet: &Sheet, columns: RangeInclusive<u32>) -> Roster {
    // Rows strictly between the header and the footer.
    let footer = sheet.last_row_in(columns.clone()).unwrap_or(HEADER_ROW);
    let data_rows = HEADER_ROW + 1..footer;

    let owners = columns
        .filter_map(|column| {
            let Some(owner) = sheet.text(HEADER_ROW, column) else {
                debug!(column = %column_letters(column), "Blank roster header, column skipped");
                return None;
            };
            let drivers = data_rows
                .clone()
                .filter_map(|row| sheet.text(row, column))
                .collect();
            Some(OwnerRoster {
                owner,
                column,
                drivers,
            })
        })
        .collect();

    Roster { owners }
}
