use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rustructure::application::scanner::{ScanReport, SymbolSeries};
use rustructure::config::Config;
use rustructure::domain::market::timeframe::Timeframe;
use rustructure::domain::structure::state::StructureStateStore;
use rustructure::infrastructure::csv_loader::{load_candles, load_directory};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file (environment variables are used when absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Structure snapshot for a single CSV series
    Analyze {
        #[arg(short, long)]
        symbol: String,

        /// Timeframe of the series (e.g. H4, 15m, daily)
        #[arg(short, long)]
        timeframe: Timeframe,

        #[arg(short, long)]
        file: PathBuf,
    },
    /// Top-down view, opportunity grades and setup for one symbol
    Topdown {
        #[arg(short, long)]
        symbol: String,

        /// Series as TF=path pairs (e.g. W1=data/eurusd_w1.csv)
        #[arg(required = true, value_parser = parse_series_arg)]
        series: Vec<(Timeframe, PathBuf)>,
    },
    /// Scan every <SYMBOL>_<TF>.csv file in a directory
    Scan {
        #[arg(short, long)]
        dir: PathBuf,
    },
}

#[derive(Serialize)]
struct ScanEntry {
    symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ScanReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_series_arg(raw: &str) -> Result<(Timeframe, PathBuf)> {
    let (timeframe, path) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected TF=path, got '{}'", raw))?;
    Ok((Timeframe::from_str(timeframe)?, PathBuf::from(path)))
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_toml_file(path),
        None => Config::from_env().context("Failed to load configuration from environment"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            symbol,
            timeframe,
            file,
        } => {
            let candles = load_candles(&file)?;
            let mut store = StructureStateStore::new();
            let snapshot = config
                .structure_engine()
                .analyze(&symbol, timeframe, &candles, &mut store)?;
            print_json(&snapshot)?;
        }
        Commands::Topdown { symbol, series } => {
            let mut loaded = SymbolSeries::new();
            for (timeframe, path) in series {
                loaded.insert(timeframe, load_candles(&path)?);
            }

            let inputs = BTreeMap::from([(symbol.to_uppercase(), loaded)]);
            let mut scanner = config.scanner();
            let result = scanner
                .scan(&inputs)
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("No result for {}", symbol))?;
            let report = result.outcome?;
            print_json(&report)?;
        }
        Commands::Scan { dir } => {
            let inputs = load_directory(&dir)?;
            info!(symbols = inputs.len(), dir = %dir.display(), "Scanning directory");

            let mut scanner = config.scanner();
            let output: Vec<ScanEntry> = scanner
                .scan(&inputs)
                .into_iter()
                .map(|result| match result.outcome {
                    Ok(report) => ScanEntry {
                        symbol: result.symbol,
                        report: Some(report),
                        error: None,
                    },
                    Err(e) => ScanEntry {
                        symbol: result.symbol,
                        report: None,
                        error: Some(e.to_string()),
                    },
                })
                .collect();
            print_json(&output)?;
        }
    }

    Ok(())
}
