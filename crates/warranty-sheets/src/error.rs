//! Error types for spreadsheet input and output.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing spreadsheets.
#[derive(Error, Debug)]
pub enum SheetError {
    /// The workbook could not be opened or parsed
    #[error("failed to read workbook {}: {source}", path.display())]
    Read {
        /// Workbook path
        path: PathBuf,
        /// Underlying reader error
        #[source]
        source: calamine::Error,
    },

    /// The workbook has no worksheets
    #[error("workbook {} contains no worksheets", path.display())]
    NoWorksheet {
        /// Workbook path
        path: PathBuf,
    },

    /// The workbook could not be generated
    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// The finished workbook could not be moved into place
    #[error("failed to replace {}: {source}", path.display())]
    Persist {
        /// Destination path
        path: PathBuf,
        /// Underlying rename error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for spreadsheet operations.
pub type Result<T> = std::result::Result<T, SheetError>;
