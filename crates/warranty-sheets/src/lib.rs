//! Warranty Sheets - Spreadsheet input and output for coverage batches.
//!
//! Serial numbers are read from the first worksheet of an Excel workbook and
//! results are appended, one row per identifier, to an `.xlsx` workbook that
//! survives across runs.
//!
//! # Example
//!
//! ```rust,no_run
//! use warranty_sheets::{load_identifiers, XlsxResultWriter};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let serials = load_identifiers(Path::new("devices.xlsx"))?;
//! let writer = XlsxResultWriter::open_or_create("results.xlsx")?;
//! println!("{} serial(s) to check, writing to {}", serials.len(), writer.path().display());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{Result, SheetError};
pub use reader::{identifiers_in, load_identifiers, SERIAL_HEADER_FRAGMENT};
pub use writer::{XlsxResultWriter, RESULT_SHEET_NAME};
