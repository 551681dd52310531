//! CLI definition and dispatch.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::text_report_adapter::{TextReportAdapter, format_screening, format_summary};
use crate::domain::config::{ReportFormat, ScreenerConfig};
use crate::domain::config_validation::validate_config;
use crate::domain::error::ScreenerError;
use crate::domain::pipeline::screen_symbol;
use crate::domain::prescreen;
use crate::domain::summary::ScreeningReport;
use crate::domain::universe::{load_market_data, parse_symbols, screen_universe};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "zonescan", about = "Multi-timeframe confluence zone screener")]
pub struct Cli {
    /// Log filter (e.g. `info`, `zonescan=debug`). Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Screen a symbol universe and write the report
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols; defaults to [data] symbols, then every CSV symbol
        #[arg(long)]
        symbols: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        format: Option<ReportFormat>,
    },
    /// Print structure, zones and opportunities for one symbol
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// Validate a screener configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols with daily data
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan {
            config,
            symbols,
            output,
            format,
        } => run_scan(&config, symbols.as_deref(), output.as_deref(), format),
        Command::Analyze { config, symbol } => run_analyze(&config, &symbol),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

fn fail(err: &ScreenerError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Reads, parses and validates the INI file at `path`.
pub fn load_config(path: &Path) -> Result<ScreenerConfig, ScreenerError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    let config = ScreenerConfig::from_port(&adapter)?;
    validate_config(&config)?;
    Ok(config)
}

/// Symbol universe: the `--symbols` override, then `[data] symbols`, then
/// every symbol the data port knows.
pub fn resolve_symbols(
    symbols_override: Option<&str>,
    config: &ScreenerConfig,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, ScreenerError> {
    match symbols_override.or(config.data.symbols.as_deref()) {
        Some(list) => Ok(parse_symbols(list)?),
        None => data_port.list_symbols(),
    }
}

pub fn report_adapter(format: ReportFormat) -> Box<dyn ReportPort> {
    match format {
        ReportFormat::Text => Box::new(TextReportAdapter::new()),
        ReportFormat::Json => Box::new(JsonReportAdapter::new()),
    }
}

fn run_scan(
    config_path: &Path,
    symbols_override: Option<&str>,
    output_override: Option<&Path>,
    format_override: Option<ReportFormat>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let data_port = CsvAdapter::new(config.data.dir.clone());
    let symbols = match resolve_symbols(symbols_override, &config, &data_port) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let output = output_override
        .map(Path::to_path_buf)
        .or_else(|| config.report.output.clone());
    let format = format_override.unwrap_or(config.report.format);

    run_scan_pipeline(
        &data_port,
        &config,
        &symbols,
        output.as_deref(),
        format,
        Utc::now(),
    )
}

/// Screens `symbols`, prints the console summary to stderr and writes the
/// report to `output` (stdout when `None`).
pub fn run_scan_pipeline(
    data_port: &dyn DataPort,
    config: &ScreenerConfig,
    symbols: &[String],
    output: Option<&Path>,
    format: ReportFormat,
    now: DateTime<Utc>,
) -> ExitCode {
    eprintln!("Screening {} symbols...", symbols.len());
    let report = match screen_universe(data_port, symbols, config, now) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    print_console_summary(&report);

    let adapter = report_adapter(format);
    match output {
        Some(path) => match adapter.write(&report, path) {
            Ok(()) => {
                eprintln!("\nReport written to: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        },
        None => match adapter.render(&report) {
            Ok(rendered) => {
                println!("{}", rendered);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        },
    }
}

fn print_console_summary(report: &ScreeningReport) {
    eprintln!("\n=== Screening Results ===");
    eprintln!("Symbols screened: {}", report.symbols_screened);
    eprintln!("Symbols skipped:  {}", report.skipped.len());
    eprintln!("Zones found:      {}", report.zones_found);
    eprintln!("Rejected:         {}", report.rejected.len());
    eprint!("{}", format_summary(&report.summary));
}

fn run_analyze(config_path: &Path, symbol: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let data_port = CsvAdapter::new(config.data.dir.clone());
    match analyze_symbol(&data_port, &config, symbol, Utc::now()) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Single-symbol analysis text. The prescreen verdict is reported but does
/// not stop the analysis.
pub fn analyze_symbol(
    data_port: &dyn DataPort,
    config: &ScreenerConfig,
    symbol: &str,
    now: DateTime<Utc>,
) -> Result<String, ScreenerError> {
    let symbol = symbol.trim().to_uppercase();
    let market = load_market_data(data_port, &symbol, &config.data.timeframes)?;
    info!(symbol = %symbol, timeframes = market.timeframes().count(), "analyzing");

    if let Some(daily) = market.daily() {
        match prescreen::passes(daily, &config.prescreen) {
            Ok(()) => eprintln!("Prescreen: passed"),
            Err(reason) => eprintln!("Prescreen: failed ({})", reason),
        }
    }

    let screening = screen_symbol(&market, config, now)?;
    Ok(format_screening(&screening))
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let timeframes: Vec<&str> = config.data.timeframes.iter().map(|t| t.as_str()).collect();
    let zone_timeframes: Vec<&str> = config
        .analysis
        .zone_timeframes
        .iter()
        .map(|t| t.as_str())
        .collect();
    eprintln!("\nData:");
    eprintln!("  dir:        {}", config.data.dir.display());
    eprintln!("  timeframes: {}", timeframes.join(", "));
    if let Some(symbols) = &config.data.symbols {
        match parse_symbols(symbols) {
            Ok(parsed) => eprintln!("  symbols:    {}", parsed.join(", ")),
            Err(e) => return fail(&ScreenerError::from(e)),
        }
    }
    eprintln!("\nZones:");
    eprintln!("  timeframes:       {}", zone_timeframes.join(", "));
    eprintln!("  min confirmations {}", config.analysis.min_confirmations);
    eprintln!("  min confluence    {:.2}", config.analysis.min_confluence_score);
    eprintln!("\nRisk:");
    eprintln!("  max risk          {:.2}%", config.trading.max_risk_pct * 100.0);
    eprintln!("  min R:R           {:.2}", config.trading.min_risk_reward);
    eprintln!("  confirmation tf   {}", config.trading.confirmation_timeframe);

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let adapter = CsvAdapter::new(config.data.dir.clone());

    let symbols = match adapter.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", config.data.dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}
