//! `hmpi` command-line entry point.
//!
//! Each subcommand reads a JSON body (or CSV for `upload`) from a file, or
//! from stdin when the path is `-`, and writes the response to stdout.
//! Logs go to stderr.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use hmpi_service::config::ServiceConfig;
use hmpi_service::ingest::request::ErrorResponse;
use hmpi_service::logging::{self, Component};
use hmpi_service::model::{HmpiError, Result};
use hmpi_service::service::HmpiService;

#[derive(Parser)]
#[command(name = "hmpi", version, about = "Heavy-metal pollution indices for water samples")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "HMPI_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Default standard (WHO, EPA or CUSTOM); overrides the configuration.
    #[arg(long, global = true)]
    standard: Option<String>,

    /// Non-detect policy (zero, half_lod, lod or exclude); overrides the configuration.
    #[arg(long, global = true)]
    non_detect_policy: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calculate indices for one sample: {"concentrations": [...], "standard": "WHO"}
    Calculate { input: String },
    /// Calculate indices for many samples: {"samples": [{"sampleId", "concentrations"}]}
    Batch { input: String },
    /// Print a reference standard table.
    Standards { name: String },
    /// Parse a wide CSV upload and calculate every sample.
    Upload { input: String },
    /// Summarize results as CSV: {"results": [{"result": {...}}]}
    Export { input: String },
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = ServiceConfig::load_with_env(cli.config.as_deref())?;
    if let Some(standard) = &cli.standard {
        config.engine.default_standard = standard.clone();
    }
    if let Some(policy) = &cli.non_detect_policy {
        config.engine.non_detect_policy = policy.parse()?;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    )?;
    logging::debug(
        Component::Config,
        None,
        &format!(
            "default standard {}, non-detect policy {}",
            config.engine.default_standard, config.engine.non_detect_policy
        ),
    );

    let service = HmpiService::new(config)?;

    let output = match &cli.command {
        Command::Calculate { input } => {
            serde_json::to_string_pretty(&service.handle_calculate_json(&read_input(input)?)?)?
        }
        Command::Batch { input } => {
            serde_json::to_string_pretty(&service.handle_batch_json(&read_input(input)?)?)?
        }
        Command::Standards { name } => serde_json::to_string_pretty(&service.standards(name)?)?,
        Command::Upload { input } => {
            serde_json::to_string_pretty(&service.upload_csv(&read_input(input)?)?)?
        }
        Command::Export { input } => service.handle_export_json(&read_input(input)?)?,
    };

    println!("{}", output);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Client errors get the JSON error body the web layer expects.
            if matches!(err, HmpiError::InvalidRequest(_) | HmpiError::UnknownStandard(_)) {
                if let Ok(body) = serde_json::to_string(&ErrorResponse::from(&err)) {
                    println!("{}", body);
                }
            }
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
