//! stockfeat CLI: fetch prices into DuckDB and derive moving-average features.
//!
//! Commands:
//! - `fetch` - download daily prices (or import a CSV) into the raw table
//! - `process` - derive MA20/MA60 from the raw table into the feature table
//! - `tables` - list the tables a store holds

mod logging;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use stockfeat_core::config::{Config, LogFormat};
use stockfeat_core::data::{CsvProvider, DataProvider, DuckDbStore, YahooProvider};
use stockfeat_core::{run_ingest, run_process};

#[derive(Parser)]
#[command(
    name = "stockfeat",
    about = "stockfeat: stock price ingestion and moving-average features"
)]
struct Cli {
    /// TOML config file (provider and logging settings).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format. Overrides the config file.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily prices from the start date up to today and replace the raw table.
    Fetch {
        /// Stock symbol (e.g., SPY).
        #[arg(long)]
        symbol: String,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start_date: String,

        /// Path to the output DuckDB file.
        #[arg(long)]
        db_path: PathBuf,

        /// Import from a CSV file instead of Yahoo Finance.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Derive MA20/MA60 features from the raw table and replace the feature table.
    Process {
        /// Path to the input raw-data DuckDB file.
        #[arg(long)]
        input_db: PathBuf,

        /// Path to the output features DuckDB file.
        #[arg(long)]
        output_db: PathBuf,

        /// Stock symbol to process.
        #[arg(long)]
        symbol: String,
    },
    /// List the tables in a DuckDB file.
    Tables {
        /// Path to the DuckDB file.
        #[arg(long)]
        db_path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let format = cli
        .log_format
        .map(LogFormat::from)
        .unwrap_or(config.logging.format);
    logging::init_logging(&config.logging.level, format);

    match cli.command {
        Commands::Fetch {
            symbol,
            start_date,
            db_path,
            csv,
        } => run_fetch(&config, &symbol, &start_date, &db_path, csv.as_deref()),
        Commands::Process {
            input_db,
            output_db,
            symbol,
        } => run_process_cmd(&input_db, &output_db, &symbol),
        Commands::Tables { db_path } => run_tables(&db_path),
    }
}

fn run_fetch(
    config: &Config,
    symbol: &str,
    start_date: &str,
    db_path: &Path,
    csv: Option<&Path>,
) -> Result<()> {
    let start = parse_date(start_date)?;
    let end = chrono::Local::now().date_naive();

    let provider: Box<dyn DataProvider> = match csv {
        Some(path) => Box::new(CsvProvider::new(path)),
        None => Box::new(YahooProvider::new(&config.provider)?),
    };
    let store = DuckDbStore::new(db_path);

    let summary = run_ingest(provider.as_ref(), &store, symbol, start, end)
        .with_context(|| format!("fetch failed for {symbol}"))?;

    println!(
        "Saved {} rows ({} to {}) to table '{}' in {}",
        summary.rows,
        summary.first_date,
        summary.last_date,
        summary.table,
        db_path.display()
    );
    Ok(())
}

fn run_process_cmd(input_db: &Path, output_db: &Path, symbol: &str) -> Result<()> {
    let input = DuckDbStore::new(input_db);
    let output = DuckDbStore::new(output_db);

    let summary = run_process(&input, &output, symbol)
        .with_context(|| format!("processing failed for {symbol}"))?;

    match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => println!(
            "Saved {} feature rows ({first} to {last}) from {} input rows to table '{}' in {}",
            summary.output_rows,
            summary.input_rows,
            summary.table,
            output_db.display()
        ),
        _ => println!(
            "Saved empty table '{}' in {}: {} input rows are fewer than the 60 MA60 needs",
            summary.table,
            output_db.display(),
            summary.input_rows
        ),
    }
    Ok(())
}

fn run_tables(db_path: &Path) -> Result<()> {
    let store = DuckDbStore::new(db_path);
    let tables = store.tables()?;
    if tables.is_empty() {
        println!("No tables in {}", db_path.display());
        return Ok(());
    }
    for table in tables {
        println!("{table}");
    }
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}
