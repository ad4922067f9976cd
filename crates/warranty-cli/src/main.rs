//! warranty-check - Bulk warranty coverage lookup.
//!
//! Reads serial numbers from a workbook, looks each one up against the
//! coverage service and appends the results to an `.xlsx` workbook.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use warranty_client::{HttpCoverageApi, TesseractOcr};
use warranty_core::{AppConfig, LookupStatus};
use warranty_scanner::LookupOrchestrator;
use warranty_sheets::{load_identifiers, XlsxResultWriter};

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,warranty=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting warranty-check v{}", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        AppConfig::default()
            .save()
            .context("failed to write default configuration")?;
        info!("Wrote default configuration to {}", AppConfig::config_path()?.display());
        return Ok(());
    }

    let config =
        AppConfig::load_with_env(args.config.as_deref()).context("failed to load configuration")?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    let input = match args.input {
        Some(path) => path,
        None => PathBuf::from(cli::prompt(
            &mut stdin.lock(),
            &mut stdout,
            "Please enter the path to the Excel file containing the serial numbers: ",
        )?),
    };

    let identifiers = load_identifiers(&input)
        .with_context(|| format!("failed to load serial numbers from {}", input.display()))?;
    if identifiers.is_empty() {
        info!("No valid serial numbers found. Exiting...");
        return Ok(());
    }

    let output_name = match args.output {
        Some(name) => name,
        None => cli::prompt(
            &mut stdin.lock(),
            &mut stdout,
            "Please enter the output Excel filename (without extension): ",
        )?,
    };
    let output = cli::resolve_output_path(&output_name);

    let mut writer = XlsxResultWriter::open_or_create(&output)
        .with_context(|| format!("failed to open results file {}", output.display()))?;

    let api = HttpCoverageApi::new(&config.endpoint).context("failed to build HTTP client")?;
    let ocr = TesseractOcr::from_config(&config.ocr);
    let orchestrator = LookupOrchestrator::new(Arc::new(api), Arc::new(ocr), &config.retry);

    let summary = orchestrator
        .run_batch(&identifiers, &mut writer)
        .await
        .with_context(|| format!("batch aborted, partial results are in {}", output.display()))?;

    for status in [
        LookupStatus::Valid,
        LookupStatus::FullyValid,
        LookupStatus::Invalid,
        LookupStatus::CannotVerifyPurchaseDate,
        LookupStatus::CannotProcess,
        LookupStatus::Unknown,
        LookupStatus::RetriesExhausted,
    ] {
        let count = summary.count(status);
        if count > 0 {
            info!("{}: {}", status, count);
        }
    }
    info!("Results have been saved to {}", output.display());

    Ok(())
}
