//! Result workbook output.
//!
//! `rust_xlsxwriter` can only produce whole workbooks, so the writer keeps
//! every row in memory and regenerates the file on each append. The new
//! workbook is written to a temporary file next to the destination and then
//! renamed over it, so an interrupted run never leaves a truncated file.

use crate::error::{Result, SheetError};
use calamine::{open_workbook_auto, Reader};
use rust_xlsxwriter::{Format, Workbook};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use warranty_core::{CoverageError, RecordSink, ResultRecord, OUTPUT_HEADERS};

/// Name of the worksheet results are written to.
pub const RESULT_SHEET_NAME: &str = "Sheet1";

/// Appends result records to an `.xlsx` workbook.
#[derive(Debug)]
pub struct XlsxResultWriter {
    path: PathBuf,
    rows: Vec<Vec<String>>,
}

impl XlsxResultWriter {
    /// Open the workbook at `path`, keeping any rows a previous run wrote,
    /// or start a new one with the header row.
    ///
    /// A new workbook is written to disk immediately so the header exists
    /// even if no record is ever appended.
    pub fn open_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if path.exists() {
            let rows = read_rows(&path)?;
            tracing::info!(
                "Appending to existing results file {} ({} row(s))",
                path.display(),
                rows.len()
            );
            let mut writer = Self { path, rows };
            if writer.rows.is_empty() {
                writer.rows.push(header_row());
                writer.save()?;
            }
            return Ok(writer);
        }

        let writer = Self {
            path,
            rows: vec![header_row()],
        };
        writer.save()?;
        tracing::info!("Created results file {}", writer.path.display());
        Ok(writer)
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows currently in the workbook, header included.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Append one record and persist the workbook.
    pub fn append_record(&mut self, record: &ResultRecord) -> Result<()> {
        self.rows.push(record.to_row().to_vec());
        if let Err(e) = self.save() {
            self.rows.pop();
            return Err(e);
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(RESULT_SHEET_NAME)?;

        for (r, row) in self.rows.iter().enumerate() {
            let r = u32::try_from(r).map_err(|_| {
                SheetError::Io(std::io::Error::other("too many rows for one worksheet"))
            })?;
            for (c, value) in row.iter().enumerate() {
                let c = u16::try_from(c).map_err(|_| {
                    SheetError::Io(std::io::Error::other("too many columns for one worksheet"))
                })?;
                if r == 0 {
                    worksheet.write_string_with_format(r, c, value, &header_format)?;
                } else {
                    worksheet.write_string(r, c, value)?;
                }
            }
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&dir)?;
        workbook.save(temp.path())?;
        temp.persist(&self.path).map_err(|e| SheetError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        Ok(())
    }
}

impl RecordSink for XlsxResultWriter {
    fn append(&mut self, record: &ResultRecord) -> warranty_core::Result<()> {
        self.append_record(record)
            .map_err(|e| CoverageError::Output(e.to_string()))
    }
}

fn header_row() -> Vec<String> {
    OUTPUT_HEADERS.iter().map(|h| (*h).to_string()).collect()
}

/// Every row of the first worksheet as text.
fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let read_error = |source| SheetError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(read_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SheetError::NoWorksheet {
            path: path.to_path_buf(),
        })?
        .map_err(read_error)?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect())
}
