//! Command-line arguments and interactive prompts.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Extension of every results workbook.
pub const OUTPUT_EXTENSION: &str = "xlsx";

#[derive(Parser, Debug)]
#[command(
    name = "warranty-check",
    version,
    about = "Bulk warranty coverage lookup for device serial numbers"
)]
pub struct Args {
    /// Excel workbook with a column whose header contains "serial"
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Results workbook; `.xlsx` is appended unless the name already ends in it
    #[arg(short, long)]
    pub output: Option<String>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the default configuration to the platform config directory and exit
    #[arg(long)]
    pub init_config: bool,
}

/// Ask for a value on stdin until a non-empty line is given.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    loop {
        write!(output, "{question}").context("failed to write prompt")?;
        output.flush().context("failed to flush prompt")?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("failed to read answer")?;
        if read == 0 {
            bail!("no answer given for: {}", question.trim());
        }

        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

/// Output path for a user-supplied name.
///
/// The workbook is always xlsx, so any other extension is kept as part of
/// the file stem.
#[must_use]
pub fn resolve_output_path(name: &str) -> PathBuf {
    let path = Path::new(name);
    let is_xlsx = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(OUTPUT_EXTENSION));
    if is_xlsx {
        path.to_path_buf()
    } else {
        PathBuf::from(format!("{name}.{OUTPUT_EXTENSION}"))
    }
}
