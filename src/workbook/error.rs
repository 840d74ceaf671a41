use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkbookError>;

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("workbook not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid xlsx package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("package part missing: {0}")]
    MissingPart(String),

    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("sheet not found: '{0}'")]
    SheetNotFound(String),

    #[error("cell {cell} in {part} anchors the formula range {range} and cannot be overwritten")]
    FormulaAnchor {
        part: String,
        cell: String,
        range: String,
    },

    #[error("invalid cell reference: '{0}'")]
    InvalidCellRef(String),
}

impl WorkbookError {
    pub(crate) fn xml(part: &str, err: impl std::fmt::Display) -> Self {
        Self::Xml {
            part: part.to_string(),
            message: err.to_string(),
        }
    }
}
