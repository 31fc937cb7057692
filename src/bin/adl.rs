//! ADL CLI - Command-line interface for the ADL trend engine
//!
//! Commands:
//! - daily: Compute daily records from a report store
//! - monthly: Evaluate the monthly trend report from stored daily records
//! - validate: Validate vendor daily reports
//! - config: Print or check the analysis configuration

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use adl_trend::pipeline::{run_daily, run_monthly};
use adl_trend::schema::ReportAdapter;
use adl_trend::types::{DailyMetricsRecord, ReportEnvelope};
use adl_trend::{AnalysisConfig, JsonFileStore, ReportEncoder, ENGINE_VERSION, PRODUCER_NAME};

/// ADL - activity-of-daily-living trends from in-home passive sensors
#[derive(Parser)]
#[command(name = "adl")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Daily ADL metrics and monthly trend status", long_about = None)]
struct Cli {
    /// Analysis configuration file (defaults apply if absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute daily records for a date range and append them to the store
    Daily {
        /// Store root directory
        #[arg(long)]
        store: PathBuf,

        /// Device ID
        #[arg(long)]
        device_id: String,

        /// First date to compute (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last date to compute (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        /// Output format for the computed records
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Evaluate the monthly trend report over stored daily records
    Monthly {
        /// Store root directory
        #[arg(long)]
        store: PathBuf,

        /// Device ID
        #[arg(long)]
        device_id: String,

        /// First record date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last record date, evaluated as "today" (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
    },

    /// Validate vendor daily reports
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective analysis configuration
    Config {
        /// Only check the configuration, print nothing on success
        #[arg(long)]
        check: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one report per line)
    Ndjson,
    /// JSON array of reports
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), AdlCliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Daily {
            store,
            device_id,
            from,
            to,
            output_format,
        } => cmd_daily(&store, &device_id, from, to, output_format, &config),

        Commands::Monthly {
            store,
            device_id,
            from,
            to,
        } => cmd_monthly(&store, &device_id, from, to, &config),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Config { check } => cmd_config(&config, check),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, AdlCliError> {
    match path {
        Some(path) => Ok(AnalysisConfig::load(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn check_range(from: NaiveDate, to: NaiveDate) -> Result<(), AdlCliError> {
    if from > to {
        return Err(AdlCliError::InvalidRange(from, to));
    }
    Ok(())
}

fn cmd_daily(
    store: &Path,
    device_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    output_format: OutputFormat,
    config: &AnalysisConfig,
) -> Result<(), AdlCliError> {
    check_range(from, to)?;
    let mut store = JsonFileStore::new(store);
    let reader = store.clone();
    let encoder = ReportEncoder::new();

    let records = run_daily(&reader, &mut store, &encoder, device_id, from, to, config)?;
    if records.is_empty() {
        return Err(AdlCliError::NoRecords);
    }

    let envelopes: Vec<ReportEnvelope<DailyMetricsRecord>> = records
        .iter()
        .map(|r| encoder.encode_daily(device_id, r))
        .collect();
    print!("{}", format_output(&envelopes, &output_format)?);
    Ok(())
}

fn cmd_monthly(
    store: &Path,
    device_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    config: &AnalysisConfig,
) -> Result<(), AdlCliError> {
    check_range(from, to)?;
    let mut store = JsonFileStore::new(store);
    let reader = store.clone();
    let encoder = ReportEncoder::new();

    let report = run_monthly(&reader, &mut store, &encoder, device_id, from, to, config)?;
    println!("{}", encoder.encode_monthly_to_json(device_id, &report)?);
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), AdlCliError> {
    // Read input
    let input_data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(AdlCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    // Parse reports
    let reports = match input_format {
        InputFormat::Ndjson => ReportAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => ReportAdapter::parse_array(&input_data)?,
    };

    // Validate each report
    let results = ReportAdapter::validate_reports(&reports);

    let report = ValidationReport {
        total_reports: reports.len(),
        valid_reports: reports.len() - results.len(),
        invalid_reports: results.len(),
        errors: results
            .into_iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                time_stamp: r.time_stamp,
                error: r.error.unwrap_or_default(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total reports:   {}", report.total_reports);
        println!("Valid reports:   {}", report.valid_reports);
        println!("Invalid reports: {}", report.invalid_reports);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Report {} (index {}): {}",
                    err.time_stamp, err.index, err.error
                );
            }
        }
    }

    if report.invalid_reports > 0 {
        Err(AdlCliError::ValidationFailed(report.invalid_reports))
    } else {
        Ok(())
    }
}

fn cmd_config(config: &AnalysisConfig, check: bool) -> Result<(), AdlCliError> {
    config.validate()?;
    if !check {
        println!("{}", config.to_json()?);
    }
    Ok(())
}

// Helper functions

fn format_output<T: serde::Serialize>(
    outputs: &[T],
    format: &OutputFormat,
) -> Result<String, AdlCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for output in outputs {
                lines.push(serde_json::to_string(output)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(outputs)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(outputs)?),
    }
}

// Error types

#[derive(Debug)]
enum AdlCliError {
    Io(io::Error),
    Compute(adl_trend::ComputeError),
    Json(serde_json::Error),
    Config(adl_trend::config::ConfigError),
    InvalidRange(NaiveDate, NaiveDate),
    NoInput,
    NoRecords,
    ValidationFailed(usize),
}

impl From<io::Error> for AdlCliError {
    fn from(e: io::Error) -> Self {
        AdlCliError::Io(e)
    }
}

impl From<adl_trend::ComputeError> for AdlCliError {
    fn from(e: adl_trend::ComputeError) -> Self {
        AdlCliError::Compute(e)
    }
}

impl From<serde_json::Error> for AdlCliError {
    fn from(e: serde_json::Error) -> Self {
        AdlCliError::Json(e)
    }
}

impl From<adl_trend::config::ConfigError> for AdlCliError {
    fn from(e: adl_trend::config::ConfigError) -> Self {
        AdlCliError::Config(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AdlCliError> for CliError {
    fn from(e: AdlCliError) -> Self {
        match e {
            AdlCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AdlCliError::Compute(e) => {
                let (code, hint) = match &e {
                    adl_trend::ComputeError::Store(_) => {
                        ("STORE_ERROR", "Check the store directory layout for the device")
                    }
                    adl_trend::ComputeError::Config(_) => {
                        ("CONFIG_ERROR", "Run 'adl config --check' to inspect the configuration")
                    }
                    adl_trend::ComputeError::Validation(_) => {
                        ("VALIDATION_ERROR", "Run 'adl validate' for details")
                    }
                    _ => ("PARSE_ERROR", "Ensure input matches the vendor report format"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            AdlCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            AdlCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Fix the configuration file or remove it to use defaults".to_string()),
            },
            AdlCliError::InvalidRange(from, to) => CliError {
                code: "INVALID_RANGE".to_string(),
                message: format!("--from {} is after --to {}", from, to),
                hint: None,
            },
            AdlCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal, nothing to read".to_string(),
                hint: Some("Pipe reports into the command or pass --input FILE".to_string()),
            },
            AdlCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No daily records could be computed".to_string(),
                hint: Some(format!(
                    "{} needs the report of the day before --from and sleep data for each day",
                    PRODUCER_NAME
                )),
            },
            AdlCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} reports failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_reports: usize,
    valid_reports: usize,
    invalid_reports: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    time_stamp: String,
    error: String,
}
