//! A1-style cell references and the values a worksheet cell can hold.

use std::fmt;
use std::str::FromStr;

use super::error::WorkbookError;

/// A 1-based (row, column) position in a worksheet.
///
/// Ordering is row-major, which is also the order cells must appear in
/// `sheetData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub column: u32,
}

impl CellRef {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}

impl FromStr for CellRef {
    type Err = WorkbookError;

    /// Parses `"B6"` into row 6, column 2. `$` anchors are ignored.
    fn from_str(reference: &str) -> Result<Self, Self::Err> {
        let invalid = || WorkbookError::InvalidCellRef(reference.to_string());

        let cleaned: String = reference.chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = cleaned.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let mut column = 0u32;
        for ch in letters.chars() {
            column = column
                .checked_mul(26)
                .and_then(|c| c.checked_add(ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1))
                .ok_or_else(invalid)?;
        }

        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }

        Ok(Self { row, column })
    }
}

/// Converts a 1-based column number to its letters (1 -> "A", 27 -> "AA").
pub fn column_letters(column: u32) -> String {
    let mut letters = Vec::new();
    let mut col = column;

    while col > 0 {
        col -= 1;
        letters.push((col % 26) as u8 + b'A');
        col /= 26;
    }

    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// The decoded value of a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
}

impl CellValue {
    /// Cell content as display text, or `None` when the cell is blank.
    ///
    /// Surrounding whitespace is dropped, so a cell holding only spaces
    /// counts as blank.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            CellValue::Empty => return None,
            CellValue::Text(s) | CellValue::Error(s) => s.trim().to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        };

        if text.is_empty() { None } else { Some(text) }
    }
}
