//! Serial number input sheets.

use crate::error::{Result, SheetError};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use warranty_core::Identifier;

/// Header fragment that marks the identifier column.
pub const SERIAL_HEADER_FRAGMENT: &str = "serial";

/// Load identifiers from the first worksheet of the workbook at `path`.
///
/// The first column whose header contains `serial` (case-insensitive) is
/// read top to bottom; blank cells are skipped. A sheet without such a
/// column yields no identifiers.
pub fn load_identifiers(path: &Path) -> Result<Vec<Identifier>> {
    let mut workbook = open_workbook_auto(path).map_err(|source| SheetError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SheetError::NoWorksheet {
            path: path.to_path_buf(),
        })?
        .map_err(|source| SheetError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let identifiers = identifiers_in(&range);
    if let Some(ids) = &identifiers {
        tracing::info!("Loaded {} serial number(s) from {}", ids.len(), path.display());
    } else {
        tracing::warn!(
            "No column containing '{}' found in {}",
            SERIAL_HEADER_FRAGMENT,
            path.display()
        );
    }

    Ok(identifiers.unwrap_or_default())
}

/// Identifiers under the serial column of `range`, or `None` when there is
/// no such column.
pub fn identifiers_in(range: &Range<Data>) -> Option<Vec<Identifier>> {
    let mut rows = range.rows();
    let header = rows.next()?;

    let column = header.iter().position(|cell| {
        cell.to_string()
            .to_lowercase()
            .contains(SERIAL_HEADER_FRAGMENT)
    })?;

    Some(
        rows.filter_map(|row| row.get(column))
            .filter_map(cell_text)
            .filter_map(|text| Identifier::new(text).ok())
            .collect(),
    )
}

/// Text of a cell, or `None` for blanks and error cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        // Whole floats display without a fractional part
        other => Some(other.to_string()),
    }
}
